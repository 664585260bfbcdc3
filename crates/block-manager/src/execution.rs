//! Seam between block production and the execution layer.

use std::collections::VecDeque;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use velum_primitives::buf::Buf32;
use velum_state::block::BlockData;
use velum_state::chain_state::ChainState;

/// What the block manager needs from the execution layer: pending
/// transactions to batch, and a state root for the header.
pub trait ExecutionClient: Send + Sync {
    /// Drains up to `max_txs` pending transactions for inclusion in the next
    /// block.
    fn get_transactions(&self, max_txs: usize) -> Vec<Vec<u8>>;

    /// Application state root after applying `data` on top of `parent`.
    fn compute_state_root(&self, parent: &ChainState, data: &BlockData) -> Buf32;
}

/// In-process execution client backed by a FIFO mempool.  The state root is
/// a hash over the parent height and the batch commitment, enough to make
/// headers position-dependent without a real state machine behind them.
#[derive(Default)]
pub struct MemExecutionClient {
    mempool: Mutex<VecDeque<Vec<u8>>>,
}

impl MemExecutionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a transaction for inclusion in a future block.
    pub fn submit_tx(&self, tx: Vec<u8>) {
        self.mempool.lock().push_back(tx);
    }

    pub fn pending_txs(&self) -> usize {
        self.mempool.lock().len()
    }
}

impl ExecutionClient for MemExecutionClient {
    fn get_transactions(&self, max_txs: usize) -> Vec<Vec<u8>> {
        let mut pool = self.mempool.lock();
        let n = max_txs.min(pool.len());
        pool.drain(..n).collect()
    }

    fn compute_state_root(&self, parent: &ChainState, data: &BlockData) -> Buf32 {
        let mut hasher = Sha256::new();
        hasher.update(parent.last_block_height().to_be_bytes());
        hasher.update(data.hash().as_slice());
        Buf32::from(<[u8; 32]>::from(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mempool_fifo_drain() {
        let exec = MemExecutionClient::new();
        exec.submit_tx(vec![1]);
        exec.submit_tx(vec![2]);
        exec.submit_tx(vec![3]);
        assert_eq!(exec.pending_txs(), 3);

        assert_eq!(exec.get_transactions(2), vec![vec![1], vec![2]]);
        assert_eq!(exec.get_transactions(10), vec![vec![3]]);
        assert_eq!(exec.pending_txs(), 0);
        assert!(exec.get_transactions(10).is_empty());
    }

    #[test]
    fn test_state_root_position_dependent() {
        use velum_primitives::params::GenesisParams;

        let exec = MemExecutionClient::new();
        let data = BlockData::new(vec![vec![7]]);
        let a = ChainState::from_genesis(&GenesisParams::new("c", 1), Buf32::from([1; 32]));
        let b = a.advance(1);

        assert_ne!(
            exec.compute_state_root(&a, &data),
            exec.compute_state_root(&b, &data)
        );
        assert_eq!(
            exec.compute_state_root(&a, &data),
            exec.compute_state_root(&a, &data)
        );
    }
}
