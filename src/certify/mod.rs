//! Certification contract commands.
//!
//! # Data Flow
//! ```text
//! HTTP body (either contract spelling)
//!     → types.rs (request shapes, flexible ids)
//!     → builder.rs (validation, ordered action list)
//!     → payload.rs (variant-specific parameter names, binary packing)
//!     → chain::ChainSession::transact
//! ```

pub mod builder;
pub mod payload;
pub mod types;

pub use builder::{AccountCreation, TransactionBuilder};
pub use types::{BuildError, BuildResult, EntityKind};
