//! Rollup genesis parameters.

use serde::{Deserialize, Serialize};

/// Genesis descriptor for the chain.  These values only matter for a node
/// starting with an empty store; once any state has been persisted the stored
/// state wins.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct GenesisParams {
    /// Chain identifier, immutable once set.
    pub chain_id: String,

    /// Height of the first block the chain will ever produce.
    pub initial_height: u64,
}

impl GenesisParams {
    pub fn new(chain_id: impl Into<String>, initial_height: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            initial_height,
        }
    }
}
