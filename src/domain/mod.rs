pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod errors;
pub mod ports;
