use std::sync::Arc;

use uuid::Uuid;

use crate::domain::account::AuthContext;
use crate::domain::cart::{CartAction, CartAdjustment, CartInfo, CartOutcome, Order};
use crate::domain::checkout::ShippingDetails;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CartStore};

/// Reconciles a user's open order against product stock.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self {
        Self { carts }
    }

    /// Reserves (`Add`) or releases (`Remove`) one unit of `product_id` for the
    /// user's open order.
    ///
    /// Adding an out-of-stock product changes nothing. Removing from a line
    /// that holds no units changes no stock and drops the empty line.
    pub fn add_or_remove(
        &self,
        ctx: &AuthContext,
        product_id: Uuid,
        action: CartAction,
    ) -> Result<CartAdjustment, DomainError> {
        let adjustment = self.carts.transaction(|store| {
            let order = open_order(store, ctx)?;
            // Product before line, always, so concurrent carts lock in the same order.
            let mut product = store
                .lock_product(product_id)?
                .ok_or(DomainError::NotFound("Product"))?;
            let line = store.lock_line(order.id, product.id)?;

            match action {
                CartAction::Add => {
                    if !product.in_stock() {
                        return Ok(CartAdjustment {
                            outcome: CartOutcome::OutOfStock,
                            product_id,
                            line_quantity: line.map_or(0, |l| l.quantity),
                            stock: product.quantity,
                        });
                    }
                    let mut line = match line {
                        Some(line) => line,
                        None => store.create_line(order.id, product.id)?,
                    };
                    line.quantity += 1;
                    product.quantity -= 1;
                    store.set_product_quantity(product.id, product.quantity)?;
                    store.set_line_quantity(line.id, line.quantity)?;
                    Ok(CartAdjustment {
                        outcome: CartOutcome::Added,
                        product_id,
                        line_quantity: line.quantity,
                        stock: product.quantity,
                    })
                }
                CartAction::Remove => match line {
                    Some(mut line) if line.quantity > 0 => {
                        line.quantity -= 1;
                        product.quantity += 1;
                        store.set_product_quantity(product.id, product.quantity)?;
                        if line.quantity <= 0 {
                            store.delete_line(line.id)?;
                        } else {
                            store.set_line_quantity(line.id, line.quantity)?;
                        }
                        Ok(CartAdjustment {
                            outcome: CartOutcome::Removed,
                            product_id,
                            line_quantity: line.quantity.max(0),
                            stock: product.quantity,
                        })
                    }
                    empty => {
                        if let Some(line) = empty {
                            store.delete_line(line.id)?;
                        }
                        Ok(CartAdjustment {
                            outcome: CartOutcome::NothingToRemove,
                            product_id,
                            line_quantity: 0,
                            stock: product.quantity,
                        })
                    }
                },
            }
        })?;

        match adjustment.outcome {
            CartOutcome::Added | CartOutcome::Removed => log::info!(
                "cart of {}: {:?} product {} (line {}, stock {})",
                ctx.username,
                adjustment.outcome,
                product_id,
                adjustment.line_quantity,
                adjustment.stock
            ),
            CartOutcome::OutOfStock | CartOutcome::NothingToRemove => log::debug!(
                "cart of {}: {:?} for product {}",
                ctx.username,
                adjustment.outcome,
                product_id
            ),
        }
        Ok(adjustment)
    }

    /// Current cart of the user. Creates the customer and order on first use.
    pub fn cart_info(&self, ctx: &AuthContext) -> Result<CartInfo, DomainError> {
        self.carts.transaction(|store| {
            let order = open_order(store, ctx)?;
            let lines = store.order_lines(order.id)?;
            Ok(CartInfo::new(order, lines))
        })
    }

    /// Stores the delivery address of `order_id` along with the customer's
    /// names. An order keeps one address; recording again replaces it.
    pub fn record_shipping(
        &self,
        ctx: &AuthContext,
        order_id: Uuid,
        details: &ShippingDetails,
    ) -> Result<(), DomainError> {
        self.carts.transaction(|store| {
            let customer = store.customer_for_user(ctx.user_id, &ctx.username)?;
            store.record_shipping(customer.id, order_id, details)
        })
    }

    /// Deletes the order and all its lines. Stock is not returned.
    pub fn clear(&self, order: &Order) -> Result<usize, DomainError> {
        let order_id = order.id;
        let removed = self
            .carts
            .transaction(move |store| store.delete_order(order_id))?;
        log::info!("cleared order {order_id} ({removed} lines)");
        Ok(removed)
    }
}

fn open_order(store: &mut dyn CartStore, ctx: &AuthContext) -> Result<Order, DomainError> {
    let customer = store.customer_for_user(ctx.user_id, &ctx.username)?;
    store.order_for_customer(customer.id)
}
