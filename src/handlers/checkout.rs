use actix_web::http::header;
use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::account::AuthContext;
use crate::domain::checkout::ShippingDetails;
use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::session::Flash;
use crate::views::{CartSummary, CheckoutPage, Chrome};
use crate::Services;

use super::{redirect_with, render};

// ── Request DTOs ─────────────────────────────────────────────────────────────

/// Shipping fields of the checkout page. Submitting them all blank checks out
/// without recording an address.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ShippingForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub phone: Option<String>,
}

impl ShippingForm {
    pub fn into_details(self) -> Option<ShippingDetails> {
        let fields = [
            &self.first_name,
            &self.last_name,
            &self.address,
            &self.city,
            &self.region,
            &self.phone,
        ];
        if fields
            .iter()
            .all(|f| f.as_deref().map_or(true, |v| v.trim().is_empty()))
        {
            return None;
        }

        let take = |field: Option<String>| field.map(|v| v.trim().to_string()).unwrap_or_default();
        Some(ShippingDetails {
            first_name: take(self.first_name),
            last_name: take(self.last_name),
            address: take(self.address),
            city: take(self.city),
            region: take(self.region),
            phone: take(self.phone),
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /checkout
#[utoipa::path(
    get,
    path = "/checkout",
    responses(
        (status = 200, description = "Cart summary and shipping form", content_type = "text/html"),
        (status = 303, description = "Not logged in, sent to the login page"),
    ),
    tag = "cart"
)]
pub async fn checkout(
    services: web::Data<Services>,
    ctx: AuthContext,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let cart = services.cart.clone();
    let owner = ctx.clone();
    let info = web::block(move || cart.cart_info(&owner)).await??;

    let page = CheckoutPage {
        chrome: Chrome::new("Checkout", Some(&ctx), &flash),
        cart: CartSummary::from(&info),
    };
    render(&page)
}

/// POST /checkout/session
///
/// Opens a hosted payment session for the cart and sends the browser there.
#[utoipa::path(
    post,
    path = "/checkout/session",
    request_body(content = ShippingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the payment page"),
        (status = 302, description = "Invalid shipping details or empty cart"),
        (status = 500, description = "Payment gateway failure"),
    ),
    tag = "cart"
)]
pub async fn create_checkout_session(
    services: web::Data<Services>,
    ctx: AuthContext,
    form: web::Form<ShippingForm>,
) -> Result<HttpResponse, AppError> {
    let shipping = form.into_inner().into_details();
    if let Some(details) = &shipping {
        if let Err(e) = details.validate() {
            log::debug!("shipping details of {} rejected: {e}", ctx.username);
            return Ok(redirect_with("/checkout", Flash::ShippingInvalid));
        }
    }

    match services.checkout.create_checkout_session(&ctx, shipping).await {
        Ok(url) => Ok(HttpResponse::SeeOther()
            .insert_header((header::LOCATION, url))
            .finish()),
        Err(DomainError::EmptyCart) => Ok(redirect_with("/cart", Flash::EmptyCart)),
        Err(e) => Err(e.into()),
    }
}

/// GET /payment/success
#[utoipa::path(
    get,
    path = "/payment/success",
    responses(
        (status = 302, description = "Cart cleared, redirected home"),
        (status = 303, description = "Not logged in, sent to the login page"),
    ),
    tag = "cart"
)]
pub async fn payment_success(
    services: web::Data<Services>,
    ctx: AuthContext,
) -> Result<HttpResponse, AppError> {
    services.checkout.on_payment_success(&ctx).await?;
    Ok(redirect_with("/", Flash::Paid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_form_means_no_shipping() {
        let form = ShippingForm {
            first_name: Some("  ".to_string()),
            ..ShippingForm::default()
        };
        assert_eq!(form.into_details(), None);
    }

    #[test]
    fn filled_form_is_trimmed() {
        let form = ShippingForm {
            first_name: Some(" Aziz ".to_string()),
            last_name: Some("Karimov".to_string()),
            address: Some("Amir Temur 1".to_string()),
            city: Some("Tashkent".to_string()),
            region: None,
            phone: Some("+998901234567".to_string()),
        };
        let details = form.into_details().unwrap();
        assert_eq!(details.first_name, "Aziz");
        assert_eq!(details.region, "");
        assert!(details.validate().is_err());
    }
}
