use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
