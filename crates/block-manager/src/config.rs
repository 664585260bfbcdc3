use std::time::Duration;

use velum_primitives::namespace::NamespaceId;

/// Runtime knobs for the block manager.
#[derive(Clone, Debug)]
pub struct BlockManagerConfig {
    /// Interval between block production attempts.
    pub block_time: Duration,

    /// Interval between DA sync polls.
    pub da_poll_interval: Duration,

    /// Namespace this rollup publishes under on the DA layer.
    pub namespace_id: NamespaceId,

    /// Whether to produce blocks when there are no pending transactions.
    pub produce_empty_blocks: bool,

    /// Upper bound on transactions pulled into a single block.
    pub max_txs_per_block: usize,
}

impl Default for BlockManagerConfig {
    fn default() -> Self {
        Self {
            block_time: Duration::from_secs(10),
            da_poll_interval: Duration::from_secs(1),
            namespace_id: NamespaceId::default(),
            produce_empty_blocks: true,
            max_txs_per_block: 100,
        }
    }
}
