//! Inclusion polling for submitted transactions.

pub mod poller;

pub use poller::{Confirmation, ConfirmationError, ConfirmationPoller, PollPolicy};
