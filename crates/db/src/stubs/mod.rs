//! In-memory stub implementations of the database traits, used in tests and
//! by the mock DA server.

pub mod chain;

pub use chain::{StubBlockDb, StubChainDb, StubStateDb};
