use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;

use crate::domain::account::AuthContext;
use crate::errors::AppError;
use crate::session::Viewer;
use crate::views::{Chrome, FavouritesPage};
use crate::Services;

use super::{redirect, render};

/// GET /favourite/{slug}
///
/// Toggles the product in the viewer's favourites and goes back to the
/// referring page. Anonymous viewers are sent back without any change.
#[utoipa::path(
    get,
    path = "/favourite/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug"),
    ),
    responses(
        (status = 302, description = "Back to the Referer, or home"),
        (status = 404, description = "Unknown product"),
    ),
    tag = "cart"
)]
pub async fn toggle_favourite(
    services: web::Data<Services>,
    req: HttpRequest,
    path: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();
    let favourites = services.favourites.clone();
    web::block(move || favourites.toggle(viewer.ctx(), &slug)).await??;

    let back = req
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/");
    Ok(redirect(back))
}

/// GET /favourites
#[utoipa::path(
    get,
    path = "/favourites",
    responses(
        (status = 200, description = "The user's favourite products", content_type = "text/html"),
        (status = 303, description = "Not logged in, sent to the login page"),
    ),
    tag = "cart"
)]
pub async fn favourites(
    services: web::Data<Services>,
    ctx: AuthContext,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let favourites = services.favourites.clone();
    let owner = ctx.clone();
    let products = web::block(move || favourites.list(&owner)).await??;

    let chrome = Chrome::new("Favourites", Some(&ctx), &flash);
    render(&FavouritesPage::new(chrome, &products))
}
