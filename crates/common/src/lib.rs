//! Ambient utilities shared by the node's services.

pub mod logging;
pub mod retry;
