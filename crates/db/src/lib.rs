//! Persistence interfaces for chain state and blocks.
//!
//! The actual storage engine lives behind these traits; the in-memory stub in
//! [`stubs`] is what tests and the mock DA server use.

pub mod errors;
pub mod stubs;
pub mod traits;

pub use errors::{DbError, DbResult};
