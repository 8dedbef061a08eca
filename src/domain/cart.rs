use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::Product;

/// Commerce-facing identity wrapping a user account.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
}

/// The open order of a customer. At most one exists per customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub shipping: bool,
}

/// Units of one product reserved by one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// An order line joined with the product it reserves.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub line: OrderLine,
    pub product: Product,
}

impl CartLine {
    pub fn total_price(&self) -> BigDecimal {
        &self.product.price * BigDecimal::from(self.line.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartInfo {
    pub order: Order,
    pub lines: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_price: BigDecimal,
}

impl CartInfo {
    pub fn new(order: Order, lines: Vec<CartLine>) -> Self {
        Self {
            total_quantity: total_quantity(&lines),
            total_price: total_price(&lines),
            order,
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub fn total_price(lines: &[CartLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.total_price())
}

pub fn total_quantity(lines: &[CartLine]) -> i64 {
    lines.iter().map(|line| i64::from(line.line.quantity)).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Add,
    Remove,
}

impl CartAction {
    /// `"add"` adds; every other action string removes.
    pub fn parse(action: &str) -> Self {
        if action == "add" {
            CartAction::Add
        } else {
            CartAction::Remove
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOutcome {
    Added,
    Removed,
    OutOfStock,
    NothingToRemove,
}

/// Result of one add/remove: the outcome plus the quantities it left behind.
/// `line_quantity` is 0 when the line no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartAdjustment {
    pub outcome: CartOutcome,
    pub product_id: Uuid,
    pub line_quantity: i32,
    pub stock: i32,
}
