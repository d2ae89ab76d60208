//! EOSIO chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (operator key, RPC URL, contract)
//!     → keys.rs (key loading, canonical signing)
//!     → action.rs / system.rs (typed payloads, binary packing)
//!     → transaction.rs (TAPOS header, digest, signatures)
//!     → session.rs (get_info → reference block → sign → push)
//!     → client.rs (RPC connection with timeouts and failover)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables or per-request bodies
//! - Never log private keys
//! - All RPC calls have configurable timeouts

pub mod action;
pub mod client;
pub mod keys;
pub mod serialize;
pub mod session;
pub mod system;
pub mod transaction;
pub mod types;

pub use action::{Action, ActionName, PermissionLevel};
pub use client::{ChainRpc, HttpChainClient, SharedChainRpc};
pub use keys::{KeyPair, PrivateKey, PublicKey, SignerSet};
pub use session::ChainSession;
pub use transaction::TransactOptions;
pub use types::{ChainConfig, ChainError, ChainResult, Name};
