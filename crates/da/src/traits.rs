use async_trait::async_trait;

use velum_state::block::Block;

use crate::types::{AvailabilityResult, RetrieveResult, SubmitResult};

/// Contract every DA backend satisfies.
///
/// Construction-time validation happens in each backend's constructor;
/// `start` is called exactly once afterwards, before the first submit or
/// retrieve.  All other operations report transient failures through their
/// result types so callers can branch on status instead of unwinding.
#[async_trait]
pub trait DataAvailabilityLayerClient: Send + Sync {
    /// Begins any background work the backend needs (tickers, connections).
    async fn start(&self) -> anyhow::Result<()>;

    /// Publishes a block.  Must be safe to call repeatedly for the same
    /// block; callers assume at-least-once semantics.
    async fn submit_block(&self, block: &Block) -> SubmitResult;

    /// Non-blocking probe for whether our namespace has data at a DA height.
    async fn check_block_availability(&self, da_height: u64) -> AvailabilityResult;

    /// Returns all blocks published at a DA height.  A DA height may host
    /// data from many rollups; filtering by namespace is the backend's
    /// responsibility.
    async fn retrieve_blocks(&self, da_height: u64) -> RetrieveResult;
}
