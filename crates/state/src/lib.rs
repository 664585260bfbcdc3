//! Chain state and block structures for the rollup.
//!
//! These types are what the block manager persists and what gets published to
//! the DA layer, so everything here has a stable borsh encoding.

pub mod block;
pub mod chain_state;
pub mod validator;
