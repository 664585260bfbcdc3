//! In-memory DA backend.
//!
//! Simulates a DA network: a ticker advances the DA height on a fixed
//! interval, and submitted blocks are recorded at whatever the DA height was
//! at submission time.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::*;

use velum_primitives::namespace::NamespaceId;
use velum_state::block::Block;

use crate::traits::DataAvailabilityLayerClient;
use crate::types::{AvailabilityResult, RetrieveResult, SubmitResult};

/// Mock backend configuration.
#[derive(Clone, Debug)]
pub struct MockDaConfig {
    /// Interval at which the simulated DA network produces a new DA height.
    pub block_time: Duration,
}

impl Default for MockDaConfig {
    fn default() -> Self {
        Self {
            block_time: Duration::from_secs(3),
        }
    }
}

#[derive(Default)]
struct MockDaStore {
    /// Blocks recorded per DA height, tagged with the namespace they were
    /// submitted under.
    heights: BTreeMap<u64, Vec<(NamespaceId, Block)>>,
}

impl MockDaStore {
    /// Finds the DA height an identical block was previously recorded at.
    fn find_existing(&self, namespace: &NamespaceId, block: &Block) -> Option<u64> {
        self.heights.iter().find_map(|(h, entries)| {
            entries
                .iter()
                .any(|(ns, b)| ns == namespace && b == block)
                .then_some(*h)
        })
    }

    fn blocks_at(&self, namespace: &NamespaceId, da_height: u64) -> Vec<Block> {
        let mut blocks: Vec<Block> = self
            .heights
            .get(&da_height)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(ns, _)| ns == namespace)
                    .map(|(_, b)| b.clone())
                    .collect()
            })
            .unwrap_or_default();
        blocks.sort_by_key(|b| b.height());
        blocks
    }
}

/// Mock DA layer client, usable in-process or behind the gRPC adapter.
pub struct MockDalc {
    namespace: NamespaceId,
    config: MockDaConfig,
    da_height: Arc<AtomicU64>,
    store: Arc<Mutex<MockDaStore>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl MockDalc {
    pub fn new(namespace: NamespaceId, config: MockDaConfig) -> Self {
        Self {
            namespace,
            config,
            da_height: Arc::new(AtomicU64::new(1)),
            store: Arc::new(Mutex::new(MockDaStore::default())),
            ticker: Mutex::new(None),
        }
    }

    /// The current simulated DA height.
    pub fn da_height(&self) -> u64 {
        self.da_height.load(Ordering::Acquire)
    }

    /// Manually advances the DA height, as the ticker would.  Mostly useful
    /// for tests that want deterministic timing.
    pub fn advance_da_height(&self) -> u64 {
        self.da_height.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Drop for MockDalc {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl DataAvailabilityLayerClient for MockDalc {
    async fn start(&self) -> anyhow::Result<()> {
        let mut slot = self.ticker.lock();
        if slot.is_some() {
            anyhow::bail!("mock DA client started twice");
        }

        let da_height = self.da_height.clone();
        let block_time = self.config.block_time;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(block_time);
            // The first tick completes immediately; skip it so the height
            // only moves after a full interval.
            interval.tick().await;
            loop {
                interval.tick().await;
                let h = da_height.fetch_add(1, Ordering::AcqRel) + 1;
                trace!(da_height = %h, "mock DA height advanced");
            }
        });
        *slot = Some(handle);

        info!(namespace = ?self.namespace, block_time = ?self.config.block_time, "mock DA client started");
        Ok(())
    }

    async fn submit_block(&self, block: &Block) -> SubmitResult {
        let mut store = self.store.lock();

        // Resubmission of an already-recorded block reports the original
        // placement instead of recording a duplicate.
        if let Some(h) = store.find_existing(&self.namespace, block) {
            debug!(height = %block.height(), da_height = %h, "duplicate submission, already recorded");
            return SubmitResult::Success { da_height: h };
        }

        let da_height = self.da_height.load(Ordering::Acquire);
        store
            .heights
            .entry(da_height)
            .or_default()
            .push((self.namespace, block.clone()));

        debug!(height = %block.height(), %da_height, "block recorded on mock DA");
        SubmitResult::Success { da_height }
    }

    async fn check_block_availability(&self, da_height: u64) -> AvailabilityResult {
        if da_height > self.da_height.load(Ordering::Acquire) {
            return AvailabilityResult::Unavailable;
        }

        let store = self.store.lock();
        if store.blocks_at(&self.namespace, da_height).is_empty() {
            AvailabilityResult::Unavailable
        } else {
            AvailabilityResult::Available
        }
    }

    async fn retrieve_blocks(&self, da_height: u64) -> RetrieveResult {
        let store = self.store.lock();
        let blocks = store.blocks_at(&self.namespace, da_height);
        if blocks.is_empty() {
            RetrieveResult::NotFound
        } else {
            RetrieveResult::Success(blocks)
        }
    }
}

#[cfg(test)]
mod tests {
    use velum_test_utils::ArbitraryGenerator;

    use super::*;

    fn make_dalc() -> MockDalc {
        MockDalc::new(NamespaceId::from([1, 2, 3, 4, 5, 6, 7, 8]), MockDaConfig::default())
    }

    #[tokio::test]
    async fn test_submit_retrieve_roundtrip() {
        let dalc = make_dalc();
        let block: Block = ArbitraryGenerator::new().generate();

        let res = dalc.submit_block(&block).await;
        let SubmitResult::Success { da_height } = res else {
            panic!("submit failed: {res:?}");
        };

        assert_eq!(
            dalc.check_block_availability(da_height).await,
            AvailabilityResult::Available
        );
        assert_eq!(
            dalc.retrieve_blocks(da_height).await,
            RetrieveResult::Success(vec![block])
        );
    }

    #[tokio::test]
    async fn test_idempotent_resubmission() {
        let dalc = make_dalc();
        let block: Block = ArbitraryGenerator::new().generate();

        let first = dalc.submit_block(&block).await;
        dalc.advance_da_height();
        let second = dalc.submit_block(&block).await;
        assert_eq!(first, second);

        let SubmitResult::Success { da_height } = first else {
            panic!("submit failed");
        };
        assert_eq!(
            dalc.retrieve_blocks(da_height).await,
            RetrieveResult::Success(vec![block])
        );
    }

    #[tokio::test]
    async fn test_unpublished_height_unavailable() {
        let dalc = make_dalc();
        assert_eq!(
            dalc.check_block_availability(10).await,
            AvailabilityResult::Unavailable
        );
        assert_eq!(dalc.retrieve_blocks(1).await, RetrieveResult::NotFound);
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let ns_a = NamespaceId::from([1; 8]);
        let ns_b = NamespaceId::from([2; 8]);
        let dalc_a = MockDalc::new(ns_a, MockDaConfig::default());
        let block: Block = ArbitraryGenerator::new().generate();

        let SubmitResult::Success { da_height } = dalc_a.submit_block(&block).await else {
            panic!("submit failed");
        };

        // A client scoped to a different namespace over the same store would
        // not see it; here each mock owns its store, so just assert the
        // filter logic directly.
        let store = dalc_a.store.lock();
        assert!(!store.blocks_at(&ns_a, da_height).is_empty());
        assert!(store.blocks_at(&ns_b, da_height).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_advances_height() {
        let dalc = MockDalc::new(
            NamespaceId::default(),
            MockDaConfig {
                block_time: Duration::from_millis(100),
            },
        );
        dalc.start().await.unwrap();
        assert!(dalc.start().await.is_err());

        let start = dalc.da_height();
        tokio::time::sleep(Duration::from_millis(350)).await;
        // Paused-clock sleeps auto-advance; the ticker should have fired a
        // few times by now.
        assert!(dalc.da_height() > start);
    }
}
