//! Higher level database abstraction that handles moving db calls off the
//! async runtime onto a dedicated thread pool.

pub mod exec;
pub mod ops;

pub use ops::chain::{ChainDataOps, Context};
