//! DA sync loop.
//!
//! Walks DA heights with a cursor.  At each height: probe availability with
//! bounded backoff, retrieve the blocks published there, validate each one
//! against the current validator set, and commit the ones that extend the
//! chain.  Blocks ahead of the tip hold the cursor until the gap fills;
//! heights that stay empty past the retry budget are skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::*;

use velum_common::retry::policies::ExponentialBackoff;
use velum_common::retry::{Backoff, DEFAULT_DA_MAX_RETRIES};
use velum_da::{AvailabilityResult, RetrieveResult};
use velum_primitives::crypto::verify_schnorr_sig;
use velum_state::block::Block;
use velum_state::validator::ValidatorSet;
use velum_tasks::ShutdownGuard;

use crate::errors::Error;
use crate::manager::{BlockManager, CommitOutcome};

pub(crate) async fn sync_task(
    manager: Arc<BlockManager>,
    shutdown: ShutdownGuard,
) -> anyhow::Result<()> {
    let mut da_cursor: u64 = 1;
    let mut interval = tokio::time::interval(manager.config().da_poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.wait_for_shutdown() => break,
        }
        if shutdown.should_shutdown() {
            break;
        }

        match poll_da_height(&manager, da_cursor, &shutdown).await {
            Ok(true) => {
                trace!(%da_cursor, "DA height settled");
                da_cursor += 1;
            }
            Ok(false) => {}
            Err(e) => {
                error!(err = %e, %da_cursor, "sync iteration failed, retrying");
            }
        }
    }

    info!("sync loop exiting");
    Ok(())
}

/// Processes one DA height.  Returns whether the cursor may advance.
pub(crate) async fn poll_da_height(
    manager: &BlockManager,
    da_height: u64,
    shutdown: &ShutdownGuard,
) -> Result<bool, Error> {
    let backoff = ExponentialBackoff::default();
    let mut delays = backoff.delays_ms();

    for attempt in 1..=DEFAULT_DA_MAX_RETRIES {
        if shutdown.should_shutdown() {
            return Ok(false);
        }

        match manager.dalc().check_block_availability(da_height).await {
            AvailabilityResult::Available => {
                return retrieve_and_apply(manager, da_height).await;
            }
            AvailabilityResult::Unavailable => {
                // Our own submissions have landed up through the watermark,
                // so heights at or below it are final on the DA network;
                // empty there means empty, no point polling again.
                if da_height <= manager.da_watermark() {
                    debug!(%da_height, "empty DA height below watermark, advancing");
                    return Ok(true);
                }
                trace!(%da_height, %attempt, "no data at DA height yet");
            }
            AvailabilityResult::Error(msg) => {
                warn!(%da_height, %attempt, %msg, "availability check failed");
            }
        }

        if attempt < DEFAULT_DA_MAX_RETRIES {
            if let Some(delay) = delays.next() {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }

    // Nothing after the full retry budget; treat the height as empty for our
    // namespace and move on.
    debug!(%da_height, "no data at DA height, advancing");
    Ok(true)
}

/// Retrieves the blocks at a DA height and applies whichever ones extend the
/// chain.  Returns whether the height is settled.
async fn retrieve_and_apply(manager: &BlockManager, da_height: u64) -> Result<bool, Error> {
    let blocks = match manager.dalc().retrieve_blocks(da_height).await {
        RetrieveResult::Success(blocks) => blocks,
        RetrieveResult::NotFound => return Ok(true),
        RetrieveResult::Error(msg) => {
            warn!(%da_height, %msg, "block retrieval failed");
            return Ok(false);
        }
    };

    debug!(%da_height, count = %blocks.len(), "retrieved blocks from DA");

    let mut all_settled = true;
    for block in blocks {
        match apply_synced_block(manager, block).await? {
            SyncOutcome::Applied | SyncOutcome::AlreadyKnown | SyncOutcome::Rejected => {}
            SyncOutcome::NotReady => all_settled = false,
        }
    }

    Ok(all_settled)
}

/// Disposition of one retrieved block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SyncOutcome {
    /// Block validated and committed.
    Applied,

    /// Block at or below the current tip; nothing to do.
    AlreadyKnown,

    /// Block failed validation and was discarded.
    Rejected,

    /// Block is ahead of the next expected height; retry once the gap fills.
    NotReady,
}

pub(crate) async fn apply_synced_block(
    manager: &BlockManager,
    block: Block,
) -> Result<SyncOutcome, Error> {
    let state = manager.state_snapshot().await;
    let expected = state.next_block_height();
    let parent_height = state.last_block_height();

    if block.height() < expected {
        trace!(height = %block.height(), %expected, "block height already covered");
        return Ok(SyncOutcome::AlreadyKnown);
    }
    if block.height() > expected {
        debug!(height = %block.height(), %expected, "block ahead of chain tip");
        return Ok(SyncOutcome::NotReady);
    }

    if !check_block_credential(&block, state.validators()) {
        warn!(height = %block.height(), "rejecting block with invalid credential");
        manager.count_rejected();
        return Ok(SyncOutcome::Rejected);
    }

    match manager.try_commit_block(block.clone(), parent_height).await? {
        CommitOutcome::Committed => {
            info!(height = %block.height(), "applied block from DA");
            Ok(SyncOutcome::Applied)
        }
        // The producer committed this height first; the committed block
        // stands.
        CommitOutcome::Stale => Ok(SyncOutcome::AlreadyKnown),
    }
}

/// Structural and authorization checks for a retrieved block: internally
/// consistent commit and data, and a valid proposer signature over the
/// header hash.
pub(crate) fn check_block_credential(block: &Block, validators: &ValidatorSet) -> bool {
    let header_hash = block.header().hash();

    if block.commit().height() != block.header().height() {
        return false;
    }
    if block.commit().header_hash() != &header_hash {
        return false;
    }
    if block.header().data_hash() != &block.data().hash() {
        return false;
    }

    let proposer = validators.proposer();
    if block.header().proposer_address() != proposer.address() {
        return false;
    }

    verify_schnorr_sig(block.commit().signature(), &header_hash, proposer.pubkey())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use threadpool::ThreadPool;

    use velum_da::mock::{MockDaConfig, MockDalc};
    use velum_da::{DataAvailabilityLayerClient, SubmitResult};
    use velum_db::stubs::StubChainDb;
    use velum_primitives::buf::Buf32;
    use velum_primitives::namespace::NamespaceId;
    use velum_primitives::params::GenesisParams;
    use velum_storage::Context;
    use velum_test_utils::chain::{gen_keypair, make_forged_block, make_signed_block};

    use crate::config::BlockManagerConfig;
    use crate::execution::MemExecutionClient;

    use super::*;

    fn make_manager_with(
        sk: Buf32,
        dalc: Arc<dyn DataAvailabilityLayerClient>,
    ) -> Arc<BlockManager> {
        let ops = Arc::new(Context::new(Arc::new(StubChainDb::new())).into_ops(ThreadPool::new(2)));
        BlockManager::new(
            BlockManagerConfig::default(),
            sk,
            &GenesisParams::new("test-chain", 1),
            ops,
            Arc::new(MemExecutionClient::new()),
            dalc,
        )
        .unwrap()
    }

    fn make_mock_dalc() -> Arc<MockDalc> {
        Arc::new(MockDalc::new(
            NamespaceId::from([7; 8]),
            MockDaConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_apply_block_from_da() {
        let (sk, _) = gen_keypair();
        let manager = make_manager_with(sk.clone(), make_mock_dalc());
        let state = manager.state_snapshot().await;
        let block = make_signed_block(&state, Buf32::zero(), vec![vec![9]], &sk);

        assert_eq!(
            apply_synced_block(&manager, block.clone()).await.unwrap(),
            SyncOutcome::Applied
        );
        assert_eq!(
            manager.state_snapshot().await.last_block_height(),
            block.height()
        );

        // Replaying the same block is a no-op.
        assert_eq!(
            apply_synced_block(&manager, block).await.unwrap(),
            SyncOutcome::AlreadyKnown
        );
    }

    #[tokio::test]
    async fn test_reject_forged_block() {
        let (sk, _) = gen_keypair();
        let manager = make_manager_with(sk, make_mock_dalc());
        let state = manager.state_snapshot().await;
        let forged = make_forged_block(&state, Buf32::zero());

        assert_eq!(
            apply_synced_block(&manager, forged).await.unwrap(),
            SyncOutcome::Rejected
        );
        assert_eq!(manager.rejected_blocks(), 1);
        assert_eq!(manager.state_snapshot().await.last_block_height(), 0);
    }

    #[tokio::test]
    async fn test_gap_holds_block() {
        let (sk, _) = gen_keypair();
        let manager = make_manager_with(sk.clone(), make_mock_dalc());
        let state = manager.state_snapshot().await;

        // Build a block two heights ahead by advancing a shadow state.
        let ahead = state.advance(state.next_block_height());
        let block = make_signed_block(&ahead, Buf32::zero(), vec![], &sk);

        assert_eq!(
            apply_synced_block(&manager, block).await.unwrap(),
            SyncOutcome::NotReady
        );
        assert_eq!(manager.state_snapshot().await.last_block_height(), 0);
    }

    /// Delegates to a mock but reports the height unavailable for the first
    /// `deny` probes, and counts probes and retrievals.
    struct FlakyDalc {
        inner: Arc<MockDalc>,
        deny: AtomicU64,
        probes: AtomicU64,
        retrieves: AtomicU64,
    }

    impl FlakyDalc {
        fn new(inner: Arc<MockDalc>, deny: u64) -> Arc<Self> {
            Arc::new(Self {
                inner,
                deny: AtomicU64::new(deny),
                probes: AtomicU64::new(0),
                retrieves: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl DataAvailabilityLayerClient for FlakyDalc {
        async fn start(&self) -> anyhow::Result<()> {
            self.inner.start().await
        }

        async fn submit_block(&self, block: &Block) -> SubmitResult {
            self.inner.submit_block(block).await
        }

        async fn check_block_availability(&self, da_height: u64) -> AvailabilityResult {
            self.probes.fetch_add(1, Ordering::AcqRel);
            if self
                .deny
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1))
                .is_ok()
            {
                return AvailabilityResult::Unavailable;
            }
            self.inner.check_block_availability(da_height).await
        }

        async fn retrieve_blocks(&self, da_height: u64) -> RetrieveResult {
            self.retrieves.fetch_add(1, Ordering::AcqRel);
            self.inner.retrieve_blocks(da_height).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_retries_then_retrieves_once() {
        let (sk, _) = gen_keypair();
        let mock = make_mock_dalc();
        let flaky = FlakyDalc::new(mock.clone(), 2);
        let manager = make_manager_with(sk.clone(), flaky.clone());

        let state = manager.state_snapshot().await;
        let block = make_signed_block(&state, Buf32::zero(), vec![vec![1]], &sk);
        let SubmitResult::Success { da_height } = mock.submit_block(&block).await else {
            panic!("mock submit failed");
        };

        let shutdown = ShutdownGuard::never();
        assert!(poll_da_height(&manager, da_height, &shutdown).await.unwrap());

        // Two unavailable probes, then exactly one retrieval.
        assert_eq!(flaky.retrieves.load(Ordering::Acquire), 1);
        assert_eq!(
            manager.state_snapshot().await.last_block_height(),
            block.height()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_watermark_skips_empty_height() {
        let (sk, _) = gen_keypair();
        let flaky = FlakyDalc::new(make_mock_dalc(), 0);
        let manager = make_manager_with(sk, flaky.clone());

        // Our own submission landed at DA height 5, so earlier heights are
        // final; an empty probe there settles after a single attempt.
        manager.record_da_height(5);
        let shutdown = ShutdownGuard::never();
        assert!(poll_da_height(&manager, 3, &shutdown).await.unwrap());
        assert_eq!(flaky.probes.load(Ordering::Acquire), 1);
        assert_eq!(flaky.retrieves.load(Ordering::Acquire), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_empty_height_advances() {
        let (sk, _) = gen_keypair();
        let manager = make_manager_with(sk, make_mock_dalc());

        let shutdown = ShutdownGuard::never();
        // Nothing was ever published at this height; after the retry budget
        // the cursor may move on.
        assert!(poll_da_height(&manager, 1, &shutdown).await.unwrap());
        assert_eq!(manager.state_snapshot().await.last_block_height(), 0);
    }
}
