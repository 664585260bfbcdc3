//! Chain state and block data operation interface.

use std::sync::Arc;

use threadpool::ThreadPool;

use velum_db::traits::*;
use velum_db::DbResult;
use velum_state::block::Block;
use velum_state::chain_state::ChainState;

use crate::exec::*;

/// Database context for a database operation interface.
pub struct Context<D: ChainDatabase> {
    db: Arc<D>,
}

impl<D: ChainDatabase + Sync + Send + 'static> Context<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    pub fn into_ops(self, pool: ThreadPool) -> ChainDataOps {
        ChainDataOps::new(pool, Arc::new(self))
    }
}

/// Thread-pool-backed accessors over the chain database, usable from both
/// async tasks and blocking contexts.
pub struct ChainDataOps {
    pool: ThreadPool,
    get_state: OpShim<(), Option<ChainState>>,
    update_state: OpShim<ChainState, ()>,
    get_block: OpShim<u64, Option<Block>>,
    put_block: OpShim<Block, ()>,
    put_block_and_state: OpShim<(Block, ChainState), ()>,
}

inst_ops! {
    (ChainDataOps => pool, Context<D: ChainDatabase>) {
        get_state => get_state_async, get_state_blocking; () => Option<ChainState>,
        update_state => update_state_async, update_state_blocking; ChainState => (),
        get_block => get_block_async, get_block_blocking; u64 => Option<Block>,
        put_block => put_block_async, put_block_blocking; Block => (),
        put_block_and_state => put_block_and_state_async, put_block_and_state_blocking; (Block, ChainState) => ()
    }
}

fn get_state<D: ChainDatabase>(context: &Context<D>, _: ()) -> DbResult<Option<ChainState>> {
    context.db.state_db().get_state()
}

fn update_state<D: ChainDatabase>(context: &Context<D>, state: ChainState) -> DbResult<()> {
    context.db.state_db().update_state(state)
}

fn get_block<D: ChainDatabase>(context: &Context<D>, height: u64) -> DbResult<Option<Block>> {
    context.db.block_db().get_block(height)
}

fn put_block<D: ChainDatabase>(context: &Context<D>, block: Block) -> DbResult<()> {
    context.db.block_db().put_block(block)
}

fn put_block_and_state<D: ChainDatabase>(
    context: &Context<D>,
    (block, state): (Block, ChainState),
) -> DbResult<()> {
    context.db.put_block_and_state(block, state)
}
