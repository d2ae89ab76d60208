//! Endpoint handlers, one module per concern.

pub mod account;
pub mod contract;
pub mod health;
pub mod lookup;
pub mod price;
