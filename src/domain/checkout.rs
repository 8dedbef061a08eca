use bigdecimal::{BigDecimal, ToPrimitive};

use super::errors::DomainError;

/// One priced line of a hosted payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Customer name and delivery address captured on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub phone: String,
}

impl ShippingDetails {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("region", &self.region),
        ];
        for (field, value) in required {
            let value = value.trim();
            if value.is_empty() {
                return Err(DomainError::InvalidInput(format!("{field} is required")));
            }
            if value.chars().count() > 200 {
                return Err(DomainError::InvalidInput(format!("{field} is too long")));
            }
        }
        validate_phone(&self.phone)
    }
}

/// Accepts digits with an optional leading `+` and the usual separators;
/// requires 7 to 15 digits.
pub fn validate_phone(phone: &str) -> Result<(), DomainError> {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    if !allowed || !(7..=15).contains(&digits) {
        return Err(DomainError::InvalidInput("invalid phone number".to_string()));
    }
    Ok(())
}

/// The integer amount charged for a cart total: the total with its fractional
/// part dropped.
pub fn unit_amount_for(total: &BigDecimal) -> Result<i64, DomainError> {
    total
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| DomainError::InvalidInput(format!("cart total {total} is out of range")))
}
