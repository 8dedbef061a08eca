pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod favourites;

use actix_web::http::header;
use actix_web::HttpResponse;
use askama::Template;
use utoipa::OpenApi;

use crate::errors::AppError;
use crate::session::Flash;

#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::home,
        catalog::category,
        catalog::product_detail,
        catalog::save_review,
        auth::login_registration,
        auth::login,
        auth::register,
        auth::logout,
        favourites::toggle_favourite,
        favourites::favourites,
        cart::cart,
        cart::to_cart,
        checkout::checkout,
        checkout::create_checkout_session,
        checkout::payment_success,
    ),
    components(schemas(auth::LoginForm, auth::RegistrationForm, catalog::ReviewForm, checkout::ShippingForm)),
    tags(
        (name = "catalog", description = "Browsing categories and products"),
        (name = "accounts", description = "Login, registration and logout"),
        (name = "cart", description = "Cart, favourites and checkout"),
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

pub(crate) fn render<T: Template>(page: &T) -> Result<HttpResponse, AppError> {
    let body = page.render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Redirects and shows `flash` on the next rendered page.
pub(crate) fn redirect_with(location: &str, flash: Flash) -> HttpResponse {
    flash.send();
    redirect(location)
}
