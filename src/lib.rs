//! Certification gateway library.
//!
//! REST endpoints that build, sign and submit transactions against an EOSIO
//! certification contract, poll blocks for inclusion, and read contract tables.

pub mod certify;
pub mod chain;
pub mod config;
pub mod confirmation;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pricing;
pub mod query;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
