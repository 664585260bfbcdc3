//! Result types for DA layer calls.
//!
//! Transient DA unavailability is a common, expected condition, so these are
//! tagged statuses the caller branches on rather than `Result` errors.

use velum_state::block::Block;

/// Outcome of publishing a block to the DA layer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitResult {
    /// Block accepted, recorded at the given DA height.
    Success { da_height: u64 },

    /// Transient failure; the same block should be resubmitted.
    Error(String),
}

impl SubmitResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Outcome of a non-blocking availability probe at a DA height.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AvailabilityResult {
    /// Data for our namespace exists at this DA height.
    Available,

    /// Nothing (yet) at this DA height; poll again later.
    Unavailable,

    /// Transient failure talking to the DA layer.
    Error(String),
}

/// Outcome of retrieving the blocks published at a DA height.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RetrieveResult {
    /// All blocks for our namespace at this DA height.
    Success(Vec<Block>),

    /// No blocks for our namespace at this DA height.
    NotFound,

    /// Transient failure talking to the DA layer.
    Error(String),
}
