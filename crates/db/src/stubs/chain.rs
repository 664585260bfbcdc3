use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use velum_state::block::Block;
use velum_state::chain_state::ChainState;

use crate::errors::*;
use crate::traits::*;

/// In-memory state store.
#[derive(Default)]
pub struct StubStateDb {
    state: Mutex<Option<ChainState>>,
}

impl StubStateDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateDatabase for StubStateDb {
    fn get_state(&self) -> DbResult<Option<ChainState>> {
        Ok(self.state.lock().clone())
    }

    fn update_state(&self, state: ChainState) -> DbResult<()> {
        *self.state.lock() = Some(state);
        Ok(())
    }
}

/// In-memory block store keyed by height.
#[derive(Default)]
pub struct StubBlockDb {
    blocks: Mutex<BTreeMap<u64, Block>>,
}

impl StubBlockDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockDatabase for StubBlockDb {
    fn put_block(&self, block: Block) -> DbResult<()> {
        let mut tbl = self.blocks.lock();
        tbl.insert(block.height(), block);
        Ok(())
    }

    fn get_block(&self, height: u64) -> DbResult<Option<Block>> {
        let tbl = self.blocks.lock();
        Ok(tbl.get(&height).cloned())
    }

    fn get_last_block_height(&self) -> DbResult<Option<u64>> {
        let tbl = self.blocks.lock();
        Ok(tbl.keys().next_back().copied())
    }
}

/// Aggregate in-memory database.
pub struct StubChainDb {
    state_db: Arc<StubStateDb>,
    block_db: Arc<StubBlockDb>,
}

impl StubChainDb {
    pub fn new() -> Self {
        Self {
            state_db: Arc::new(StubStateDb::new()),
            block_db: Arc::new(StubBlockDb::new()),
        }
    }
}

impl Default for StubChainDb {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainDatabase for StubChainDb {
    type StateDB = StubStateDb;
    type BlockDB = StubBlockDb;

    fn state_db(&self) -> &Arc<Self::StateDB> {
        &self.state_db
    }

    fn block_db(&self) -> &Arc<Self::BlockDB> {
        &self.block_db
    }

    fn put_block_and_state(&self, block: Block, state: ChainState) -> DbResult<()> {
        // Hold both table locks for the whole write so readers never observe
        // the block without the state or vice versa.
        let mut blocks = self.block_db.blocks.lock();
        let mut st = self.state_db.state.lock();
        blocks.insert(block.height(), block);
        *st = Some(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use velum_test_utils::ArbitraryGenerator;

    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let db = StubChainDb::new();
        assert!(db.state_db().get_state().unwrap().is_none());

        let state: ChainState = ArbitraryGenerator::new().generate();
        db.state_db().update_state(state.clone()).unwrap();
        assert_eq!(db.state_db().get_state().unwrap(), Some(state));
    }

    #[test]
    fn test_block_roundtrip() {
        let db = StubChainDb::new();
        let block: Block = ArbitraryGenerator::new().generate();
        let height = block.height();

        assert!(db.block_db().get_block(height).unwrap().is_none());
        db.block_db().put_block(block.clone()).unwrap();
        assert_eq!(db.block_db().get_block(height).unwrap(), Some(block));
        assert_eq!(db.block_db().get_last_block_height().unwrap(), Some(height));
    }

    #[test]
    fn test_atomic_commit() {
        let db = StubChainDb::new();
        let gen = ArbitraryGenerator::new();
        let block: Block = gen.generate();
        let state: ChainState = gen.generate();

        db.put_block_and_state(block.clone(), state.clone()).unwrap();
        assert_eq!(db.block_db().get_block(block.height()).unwrap(), Some(block));
        assert_eq!(db.state_db().get_state().unwrap(), Some(state));
    }
}
