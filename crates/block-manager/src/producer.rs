//! Block production loop.
//!
//! Each tick builds at most one block: pull transactions, build and sign the
//! header, persist the block and advanced state atomically, then publish to
//! the DA layer.  Persistence always happens before publication, so a crash
//! in between is recovered by resubmitting the stored head block.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::MissedTickBehavior;
use tracing::*;

use velum_common::retry::policies::ExponentialBackoff;
use velum_common::retry::{Backoff, DEFAULT_DA_MAX_RETRIES};
use velum_da::SubmitResult;
use velum_primitives::buf::Buf32;
use velum_primitives::crypto::{compute_address, sign_schnorr_sig};
use velum_state::block::{Block, BlockData, BlockHeader, Commit};
use velum_tasks::ShutdownGuard;

use crate::errors::Error;
use crate::manager::{BlockManager, CommitOutcome};

pub(crate) async fn producer_task(
    manager: Arc<BlockManager>,
    shutdown: ShutdownGuard,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(manager.config().block_time);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Resubmit whatever the store says is our head.  If the previous run
    // crashed after persisting but before publishing, this is the lost
    // submission; otherwise the DA layer treats it as a duplicate.
    let mut pending = manager.stored_head_block().await?;
    if let Some(block) = &pending {
        info!(height = %block.height(), "resubmitting stored head block");
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.wait_for_shutdown() => break,
        }
        if shutdown.should_shutdown() {
            break;
        }

        if pending.is_none() {
            match produce_block(&manager).await {
                Ok(produced) => pending = produced,
                Err(e) => {
                    error!(err = %e, "block production failed, retrying next tick");
                    continue;
                }
            }
        }

        if let Some(block) = pending.take() {
            if !submit_with_retries(&manager, &block, &shutdown).await {
                // Keep it pending; the next tick picks it back up.
                pending = Some(block);
            }
        }
    }

    info!("producer loop exiting");
    Ok(())
}

/// Builds, signs, and locally commits one block on the current chain tip.
/// Returns `None` when production was skipped or lost the commit race to the
/// sync loop.
pub(crate) async fn produce_block(manager: &BlockManager) -> Result<Option<Block>, Error> {
    let state = manager.state_snapshot().await;
    let parent_height = state.last_block_height();
    let height = state.next_block_height();

    // Transactions are pulled outside the state lock; the tip re-check at
    // commit time covers the race.
    let txs = manager
        .exec()
        .get_transactions(manager.config().max_txs_per_block);
    if txs.is_empty() && !manager.config().produce_empty_blocks {
        trace!(%height, "no pending transactions, skipping production");
        return Ok(None);
    }

    let prev_block_hash = match parent_height {
        0 => Buf32::zero(),
        h => manager
            .ops()
            .get_block_async(h)
            .await?
            .ok_or(Error::MissingBlock(h))?
            .header()
            .hash(),
    };

    let data = BlockData::new(txs);
    let state_root = manager.exec().compute_state_root(&state, &data);
    let header = BlockHeader::new(
        height,
        unix_millis(),
        prev_block_hash,
        data.hash(),
        state_root,
        compute_address(manager.sequencer_pk()),
    );
    let header_hash = header.hash();
    let sig = sign_schnorr_sig(&header_hash, manager.sequencer_sk());
    let block = Block::new(header, data, Commit::new(height, header_hash, sig));

    match manager.try_commit_block(block.clone(), parent_height).await? {
        CommitOutcome::Committed => {
            info!(%height, txs = %block.data().txs().len(), "produced block");
            Ok(Some(block))
        }
        CommitOutcome::Stale => {
            debug!(%height, "chain advanced during production, discarding block");
            Ok(None)
        }
    }
}

/// Tries to publish the block, backing off between attempts.  Returns whether
/// the block landed; on `false` the caller keeps it pending for the next
/// tick.
async fn submit_with_retries(
    manager: &BlockManager,
    block: &Block,
    shutdown: &ShutdownGuard,
) -> bool {
    let backoff = ExponentialBackoff::default();
    let mut delays = backoff.delays_ms();

    for attempt in 1..=DEFAULT_DA_MAX_RETRIES {
        if shutdown.should_shutdown() {
            return false;
        }

        match manager.dalc().submit_block(block).await {
            SubmitResult::Success { da_height } => {
                manager.record_da_height(da_height);
                info!(height = %block.height(), %da_height, "block published to DA");
                return true;
            }
            SubmitResult::Error(msg) => {
                warn!(height = %block.height(), %attempt, %msg, "DA submission failed");
            }
        }

        if attempt < DEFAULT_DA_MAX_RETRIES {
            if let Some(delay) = delays.next() {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }

    false
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use threadpool::ThreadPool;

    use velum_da::mock::{MockDaConfig, MockDalc};
    use velum_db::stubs::StubChainDb;
    use velum_primitives::namespace::NamespaceId;
    use velum_primitives::params::GenesisParams;
    use velum_storage::{ChainDataOps, Context};
    use velum_test_utils::chain::gen_keypair;

    use crate::config::BlockManagerConfig;
    use crate::execution::MemExecutionClient;

    use super::*;

    fn make_ops() -> Arc<ChainDataOps> {
        let db = Arc::new(StubChainDb::new());
        Arc::new(Context::new(db).into_ops(ThreadPool::new(2)))
    }

    fn make_manager(
        produce_empty_blocks: bool,
    ) -> (Arc<BlockManager>, Arc<MemExecutionClient>, Arc<MockDalc>) {
        let (sk, _) = gen_keypair();
        let ops = make_ops();
        let exec = Arc::new(MemExecutionClient::new());
        let dalc = Arc::new(MockDalc::new(
            NamespaceId::from([7; 8]),
            MockDaConfig::default(),
        ));
        let config = BlockManagerConfig {
            produce_empty_blocks,
            ..Default::default()
        };
        let manager = BlockManager::new(
            config,
            sk,
            &GenesisParams::new("test-chain", 1),
            ops,
            exec.clone(),
            dalc.clone(),
        )
        .unwrap();
        (manager, exec, dalc)
    }

    #[tokio::test]
    async fn test_produce_monotonic_heights() {
        let (manager, _, _) = make_manager(true);

        for expected in 1..=3u64 {
            let block = produce_block(&manager).await.unwrap().expect("block");
            assert_eq!(block.height(), expected);
            assert_eq!(
                manager.state_snapshot().await.last_block_height(),
                expected
            );
        }

        // Blocks were persisted along the way.
        assert!(manager.ops().get_block_async(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_skip_empty_when_configured() {
        let (manager, exec, _) = make_manager(false);
        assert!(produce_block(&manager).await.unwrap().is_none());
        assert_eq!(manager.state_snapshot().await.last_block_height(), 0);

        exec.submit_tx(vec![1, 2, 3]);
        let block = produce_block(&manager).await.unwrap().expect("block");
        assert_eq!(block.data().txs(), &[vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_prev_hash_links() {
        let (manager, _, _) = make_manager(true);
        let first = produce_block(&manager).await.unwrap().unwrap();
        let second = produce_block(&manager).await.unwrap().unwrap();

        assert_eq!(first.header().prev_block_hash(), &Buf32::zero());
        assert_eq!(second.header().prev_block_hash(), &first.header().hash());
    }

    #[tokio::test]
    async fn test_stale_commit_loses() {
        let (manager, _, _) = make_manager(true);
        let first = produce_block(&manager).await.unwrap().unwrap();

        // A commit attempted against the pre-advance tip must lose.
        let outcome = manager.try_commit_block(first, 0).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Stale);
        assert_eq!(manager.state_snapshot().await.last_block_height(), 1);
    }

    #[tokio::test]
    async fn test_submission_records_watermark() {
        let (manager, _, _) = make_manager(true);
        let block = produce_block(&manager).await.unwrap().unwrap();

        let SubmitResult::Success { da_height } = manager.dalc().submit_block(&block).await else {
            panic!("mock submit failed");
        };
        manager.record_da_height(da_height);
        assert_eq!(manager.da_watermark(), da_height);
    }

    #[tokio::test]
    async fn test_head_block_recovery() {
        let (sk, _) = gen_keypair();
        let ops = make_ops();
        let dalc = Arc::new(MockDalc::new(
            NamespaceId::from([7; 8]),
            MockDaConfig::default(),
        ));
        let genesis = GenesisParams::new("test-chain", 1);
        let manager = BlockManager::new(
            BlockManagerConfig::default(),
            sk.clone(),
            &genesis,
            ops.clone(),
            Arc::new(MemExecutionClient::new()),
            dalc.clone(),
        )
        .unwrap();
        assert!(manager.stored_head_block().await.unwrap().is_none());

        let block = produce_block(&manager).await.unwrap().unwrap();

        // A restart over the same store resumes at the tip and sees the head
        // block, so a submission lost to a crash gets retried.
        let restarted = BlockManager::new(
            BlockManagerConfig::default(),
            sk,
            &genesis,
            ops,
            Arc::new(MemExecutionClient::new()),
            dalc,
        )
        .unwrap();
        assert_eq!(
            restarted.state_snapshot().await.last_block_height(),
            block.height()
        );
        assert_eq!(restarted.stored_head_block().await.unwrap(), Some(block));
    }
}
