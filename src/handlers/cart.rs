use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;
use uuid::Uuid;

use crate::domain::account::AuthContext;
use crate::domain::cart::CartAction;
use crate::errors::AppError;
use crate::views::{CartPage, CartSummary, Chrome};
use crate::Services;

use super::{redirect, render};

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "The user's cart", content_type = "text/html"),
        (status = 303, description = "Not logged in, sent to the login page"),
    ),
    tag = "cart"
)]
pub async fn cart(
    services: web::Data<Services>,
    ctx: AuthContext,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let cart = services.cart.clone();
    let owner = ctx.clone();
    let info = web::block(move || cart.cart_info(&owner)).await??;

    let page = CartPage {
        chrome: Chrome::new("Cart", Some(&ctx), &flash),
        cart: CartSummary::from(&info),
    };
    render(&page)
}

/// GET /to_cart/{product_id}/{action}
///
/// `add` reserves one unit, any other action releases one. An out-of-stock add
/// leaves the cart untouched.
#[utoipa::path(
    get,
    path = "/to_cart/{product_id}/{action}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("action" = String, Path, description = "add, or anything else to remove"),
    ),
    responses(
        (status = 302, description = "Back to the cart"),
        (status = 303, description = "Not logged in, sent to the login page"),
        (status = 404, description = "Unknown product"),
    ),
    tag = "cart"
)]
pub async fn to_cart(
    services: web::Data<Services>,
    ctx: AuthContext,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, AppError> {
    let (product_id, action) = path.into_inner();
    let action = CartAction::parse(&action);
    let cart = services.cart.clone();
    web::block(move || cart.add_or_remove(&ctx, product_id, action)).await??;

    Ok(redirect("/cart"))
}
