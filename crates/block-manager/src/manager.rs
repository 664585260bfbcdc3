//! Startup state resolution and the shared core both loops operate on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::*;

use velum_da::DataAvailabilityLayerClient;
use velum_primitives::buf::Buf32;
use velum_primitives::crypto::derive_xonly_pubkey;
use velum_primitives::params::GenesisParams;
use velum_state::block::Block;
use velum_state::chain_state::ChainState;
use velum_storage::ChainDataOps;
use velum_tasks::TaskExecutor;

use crate::config::BlockManagerConfig;
use crate::errors::Error;
use crate::execution::ExecutionClient;
use crate::{producer, sync};

/// Resolves the node's chain state at startup.
///
/// An empty store yields the genesis-derived state; a populated store is
/// authoritative and genesis is only consulted as a sanity cross-check.  Any
/// store failure other than "nothing stored yet" is fatal.
pub fn resolve_initial_state(
    genesis: &GenesisParams,
    sequencer_pubkey: Buf32,
    ops: &ChainDataOps,
) -> Result<ChainState, Error> {
    // Height 0 is reserved as the "no block accepted yet" marker; a chain
    // whose first block sits there could never advance past it.
    if genesis.initial_height == 0 {
        return Err(Error::InvalidGenesis);
    }

    match ops.get_state_blocking(()) {
        Ok(Some(state)) => {
            if state.chain_id() != genesis.chain_id {
                warn!(
                    stored = %state.chain_id(),
                    genesis = %genesis.chain_id,
                    "stored chain id differs from genesis"
                );
            }
            info!(height = %state.last_block_height(), "resuming from stored state");
            Ok(state)
        }
        Ok(None) => {
            info!(
                chain_id = %genesis.chain_id,
                initial_height = %genesis.initial_height,
                "empty store, deriving state from genesis"
            );
            Ok(ChainState::from_genesis(genesis, sequencer_pubkey))
        }
        Err(e) => Err(Error::StateResolution(e)),
    }
}

/// Outcome of a guarded commit attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CommitOutcome {
    /// Block persisted and the in-memory state advanced.
    Committed,

    /// The chain tip moved since the caller observed it; block discarded.
    Stale,
}

/// Shared core of the block manager.  Owns the guarded chain state and the
/// collaborator handles; the producer and sync loops run against it.
pub struct BlockManager {
    config: BlockManagerConfig,
    sequencer_sk: Buf32,
    sequencer_pk: Buf32,
    state: Mutex<ChainState>,
    ops: Arc<ChainDataOps>,
    exec: Arc<dyn ExecutionClient>,
    dalc: Arc<dyn DataAvailabilityLayerClient>,

    /// Highest DA height a local submission has been recorded at.
    da_watermark: AtomicU64,

    /// Retrieved blocks discarded by validation.
    rejected_blocks: AtomicU64,
}

impl BlockManager {
    pub fn new(
        config: BlockManagerConfig,
        sequencer_sk: Buf32,
        genesis: &GenesisParams,
        ops: Arc<ChainDataOps>,
        exec: Arc<dyn ExecutionClient>,
        dalc: Arc<dyn DataAvailabilityLayerClient>,
    ) -> Result<Arc<Self>, Error> {
        let sequencer_pk = derive_xonly_pubkey(&sequencer_sk);
        let state = resolve_initial_state(genesis, sequencer_pk, &ops)?;

        Ok(Arc::new(Self {
            config,
            sequencer_sk,
            sequencer_pk,
            state: Mutex::new(state),
            ops,
            exec,
            dalc,
            da_watermark: AtomicU64::new(0),
            rejected_blocks: AtomicU64::new(0),
        }))
    }

    /// Spawns the producer and sync loops on the executor.
    pub fn start(self: &Arc<Self>, executor: &TaskExecutor) {
        info!(namespace = ?self.config.namespace_id, "starting block manager");

        let manager = self.clone();
        executor.spawn_critical_async_with_shutdown("block_manager_producer", move |shutdown| {
            producer::producer_task(manager, shutdown)
        });

        let manager = self.clone();
        executor.spawn_critical_async_with_shutdown("block_manager_sync", move |shutdown| {
            sync::sync_task(manager, shutdown)
        });
    }

    pub fn config(&self) -> &BlockManagerConfig {
        &self.config
    }

    pub(crate) fn sequencer_sk(&self) -> &Buf32 {
        &self.sequencer_sk
    }

    pub(crate) fn sequencer_pk(&self) -> &Buf32 {
        &self.sequencer_pk
    }

    pub(crate) fn ops(&self) -> &ChainDataOps {
        &self.ops
    }

    pub(crate) fn exec(&self) -> &dyn ExecutionClient {
        self.exec.as_ref()
    }

    pub(crate) fn dalc(&self) -> &dyn DataAvailabilityLayerClient {
        self.dalc.as_ref()
    }

    /// A clone of the current chain state.
    pub async fn state_snapshot(&self) -> ChainState {
        self.state.lock().await.clone()
    }

    /// Highest DA height a local submission has landed at.
    pub fn da_watermark(&self) -> u64 {
        self.da_watermark.load(Ordering::Acquire)
    }

    pub(crate) fn record_da_height(&self, da_height: u64) {
        self.da_watermark.fetch_max(da_height, Ordering::AcqRel);
    }

    /// Count of retrieved blocks discarded by validation.
    pub fn rejected_blocks(&self) -> u64 {
        self.rejected_blocks.load(Ordering::Acquire)
    }

    pub(crate) fn count_rejected(&self) {
        self.rejected_blocks.fetch_add(1, Ordering::AcqRel);
    }

    /// The block at the stored chain tip, if any.  Used at producer startup
    /// to recover a submission that may have been lost to a crash.
    pub(crate) async fn stored_head_block(&self) -> Result<Option<Block>, Error> {
        let last = self.state.lock().await.last_block_height();
        if last == 0 {
            return Ok(None);
        }

        let block = self
            .ops
            .get_block_async(last)
            .await?
            .ok_or(Error::MissingBlock(last))?;
        Ok(Some(block))
    }

    /// Commits `block` if the chain tip is still at `parent_height`.  Both
    /// loops route their accepts through here: the tip is re-checked under
    /// the lock, and the block plus the advanced state are persisted
    /// atomically before the in-memory state moves.
    pub(crate) async fn try_commit_block(
        &self,
        block: Block,
        parent_height: u64,
    ) -> Result<CommitOutcome, Error> {
        let mut state = self.state.lock().await;
        if state.last_block_height() != parent_height {
            return Ok(CommitOutcome::Stale);
        }

        let next = state.advance(block.height());
        self.ops
            .put_block_and_state_async((block, next.clone()))
            .await?;
        *state = next;
        Ok(CommitOutcome::Committed)
    }
}
