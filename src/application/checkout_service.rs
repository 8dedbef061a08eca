use std::sync::Arc;

use crate::application::cart_service::CartService;
use crate::domain::account::AuthContext;
use crate::domain::checkout::{unit_amount_for, CheckoutSessionRequest, LineItem, ShippingDetails};
use crate::domain::cart::CartInfo;
use crate::domain::errors::DomainError;
use crate::domain::ports::PaymentGateway;

pub const DEFAULT_ITEM_NAME: &str = "PRODUCT in TOTEMBO";

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Absolute base of the storefront, without trailing slash.
    pub public_base_url: String,
    /// Name of the single aggregated line item shown by the payment page.
    pub item_name: String,
}

impl CheckoutSettings {
    pub fn success_url(&self) -> String {
        format!("{}/payment/success", self.public_base_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/checkout", self.public_base_url)
    }
}

/// Hands the cart total to the payment gateway and clears the cart once paid.
#[derive(Clone)]
pub struct CheckoutService {
    cart: CartService,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(
        cart: CartService,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            cart,
            gateway,
            settings,
        }
    }

    /// Opens a hosted payment session for the user's cart and returns its URL.
    ///
    /// An empty cart is rejected before the gateway is contacted. Shipping
    /// details are stored only once the gateway has accepted the session.
    /// Gateway failures are returned as is; there is no retry.
    pub async fn create_checkout_session(
        &self,
        ctx: &AuthContext,
        shipping: Option<ShippingDetails>,
    ) -> Result<String, DomainError> {
        if let Some(details) = &shipping {
            details.validate()?;
        }
        let cart = self.cart.clone();
        let owner = ctx.clone();
        let info = tokio::task::spawn_blocking(move || cart.cart_info(&owner))
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))??;

        if info.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let request = self.session_request(&info)?;
        let url = self.gateway.create_session(&request).await.map_err(|e| {
            log::error!("payment session for order {} failed: {e}", info.order.id);
            e
        })?;

        if let Some(details) = shipping {
            let cart = self.cart.clone();
            let owner = ctx.clone();
            let order_id = info.order.id;
            tokio::task::spawn_blocking(move || cart.record_shipping(&owner, order_id, &details))
                .await
                .map_err(|e| DomainError::Internal(e.to_string()))??;
        }
        log::info!(
            "payment session opened for order {} ({} total {})",
            info.order.id,
            ctx.username,
            info.total_price
        );
        Ok(url)
    }

    /// Payment confirmed: the user's order and its lines are deleted.
    pub async fn on_payment_success(&self, ctx: &AuthContext) -> Result<usize, DomainError> {
        let cart = self.cart.clone();
        let owner = ctx.clone();
        tokio::task::spawn_blocking(move || {
            let info = cart.cart_info(&owner)?;
            cart.clear(&info.order)
        })
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
    }

    fn session_request(&self, info: &CartInfo) -> Result<CheckoutSessionRequest, DomainError> {
        Ok(CheckoutSessionRequest {
            line_items: vec![LineItem {
                name: self.settings.item_name.clone(),
                unit_amount: unit_amount_for(&info.total_price)?,
                quantity: 1,
            }],
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
        })
    }
}
