//! Block production and DA coordination.
//!
//! The [`manager::BlockManager`] resolves the node's chain state on startup
//! and then drives two long-lived loops: the producer loop builds, persists,
//! and publishes new blocks, while the sync loop pulls blocks other nodes
//! published on the DA layer and applies them.  Both loops share the same
//! guarded state and the last committed height always wins.

pub mod config;
pub mod errors;
pub mod execution;
pub mod manager;
pub mod producer;
pub mod sync;

pub use config::BlockManagerConfig;
pub use manager::BlockManager;
