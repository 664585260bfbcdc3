//! Trait definitions for low level database interfaces.

use std::sync::Arc;

use velum_state::block::Block;
use velum_state::chain_state::ChainState;

use crate::DbResult;

/// Aggregate database interface that worker tasks are parameterized over.
pub trait ChainDatabase {
    type StateDB: StateDatabase + Send + Sync;
    type BlockDB: BlockDatabase + Send + Sync;

    fn state_db(&self) -> &Arc<Self::StateDB>;
    fn block_db(&self) -> &Arc<Self::BlockDB>;

    /// Persists a block together with the state resulting from accepting it,
    /// as a single atomic unit.  Either both land or neither does; a crash
    /// must never leave one without the other.
    fn put_block_and_state(&self, block: Block, state: ChainState) -> DbResult<()>;
}

/// Store for the node's canonical chain state record.
pub trait StateDatabase {
    /// Returns the persisted state, or `None` if the store is fresh.
    fn get_state(&self) -> DbResult<Option<ChainState>>;

    /// Overwrites the persisted state.
    fn update_state(&self, state: ChainState) -> DbResult<()>;
}

/// Store for accepted blocks, keyed by height.
pub trait BlockDatabase {
    /// Persists a block at its header height.  Overwriting the same height
    /// with identical content is allowed; heights are otherwise append-only.
    fn put_block(&self, block: Block) -> DbResult<()>;

    /// Fetches the block stored at a height, if any.
    fn get_block(&self, height: u64) -> DbResult<Option<Block>>;

    /// Height of the highest stored block, if any.
    fn get_last_block_height(&self) -> DbResult<Option<u64>>;
}
