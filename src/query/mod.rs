//! Point lookups against contract tables.

pub mod table;

pub use table::{QueryError, TableKey, TableQuery};
