//! Request middleware.

pub mod metrics;
pub mod timeout;
