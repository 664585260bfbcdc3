use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};

use velum_primitives::buf::{Buf20, Buf32, Buf64};

/// Header that links a block into the chain and commits to its contents.
#[derive(Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize)]
pub struct BlockHeader {
    /// Rollup block height.
    height: u64,

    /// Timestamp the block was (intended to be) published at, unix millis.
    timestamp: u64,

    /// Hash of the previous block's header, zero for the first block.
    prev_block_hash: Buf32,

    /// Commitment to the transaction batch.
    data_hash: Buf32,

    /// Application state root after applying this block, as reported by the
    /// execution layer.
    state_root: Buf32,

    /// Address of the proposer that built this block.
    proposer_address: Buf20,
}

impl BlockHeader {
    pub fn new(
        height: u64,
        timestamp: u64,
        prev_block_hash: Buf32,
        data_hash: Buf32,
        state_root: Buf32,
        proposer_address: Buf20,
    ) -> Self {
        Self {
            height,
            timestamp,
            prev_block_hash,
            data_hash,
            state_root,
            proposer_address,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn prev_block_hash(&self) -> &Buf32 {
        &self.prev_block_hash
    }

    pub fn data_hash(&self) -> &Buf32 {
        &self.data_hash
    }

    pub fn state_root(&self) -> &Buf32 {
        &self.state_root
    }

    pub fn proposer_address(&self) -> &Buf20 {
        &self.proposer_address
    }

    /// Computes the header hash, which is also the commitment the proposer
    /// signs over.
    pub fn hash(&self) -> Buf32 {
        let buf = borsh::to_vec(self).expect("block: serialize header");
        let h = <sha2::Sha256 as digest::Digest>::digest(&buf);
        Buf32::from(<[u8; 32]>::from(h))
    }
}

/// The block's transaction batch.  Contents are opaque at this layer, the
/// execution collaborator interprets them.
#[derive(Clone, Debug, Default, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize)]
pub struct BlockData {
    txs: Vec<Vec<u8>>,
}

impl BlockData {
    pub fn new(txs: Vec<Vec<u8>>) -> Self {
        Self { txs }
    }

    pub fn txs(&self) -> &[Vec<u8>] {
        &self.txs
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn hash(&self) -> Buf32 {
        let buf = borsh::to_vec(self).expect("block: serialize data");
        let h = <sha2::Sha256 as digest::Digest>::digest(&buf);
        Buf32::from(<[u8; 32]>::from(h))
    }
}

/// The proposer's commitment over a block header.
#[derive(Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize)]
pub struct Commit {
    height: u64,
    header_hash: Buf32,
    signature: Buf64,
}

impl Commit {
    pub fn new(height: u64, header_hash: Buf32, signature: Buf64) -> Self {
        Self {
            height,
            header_hash,
            signature,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn header_hash(&self) -> &Buf32 {
        &self.header_hash
    }

    pub fn signature(&self) -> &Buf64 {
        &self.signature
    }
}

/// A complete block: header, transaction batch, and the proposer's commit.
/// Immutable once persisted.
#[derive(Clone, Debug, Eq, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct Block {
    header: BlockHeader,
    data: BlockData,
    commit: Commit,
}

impl Block {
    pub fn new(header: BlockHeader, data: BlockData, commit: Commit) -> Self {
        Self {
            header,
            data,
            commit,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn data(&self) -> &BlockData {
        &self.data
    }

    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }
}

/// Careful impl that keeps the commit consistent with the header, so
/// generated blocks survive structural sanity checks.
impl<'a> Arbitrary<'a> for Block {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let header = BlockHeader::arbitrary(u)?;
        let data = BlockData::arbitrary(u)?;
        let commit = Commit::new(header.height(), header.hash(), Buf64::arbitrary(u)?);
        Ok(Self::new(header, data, commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(height: u64) -> BlockHeader {
        BlockHeader::new(
            height,
            1_700_000_000_000,
            Buf32::zero(),
            Buf32::from([1; 32]),
            Buf32::from([2; 32]),
            Buf20::from([3; 20]),
        )
    }

    #[test]
    fn test_header_hash_sensitivity() {
        let a = sample_header(5);
        let b = sample_header(6);
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), sample_header(5).hash());
    }

    #[test]
    fn test_block_borsh_roundtrip() {
        let header = sample_header(7);
        let data = BlockData::new(vec![vec![1, 2, 3], vec![4]]);
        let commit = Commit::new(7, header.hash(), Buf64::zero());
        let block = Block::new(header, data, commit);

        let enc = borsh::to_vec(&block).unwrap();
        let dec: Block = borsh::from_slice(&enc).unwrap();
        assert_eq!(block, dec);
    }

    #[test]
    fn test_data_hash_distinct() {
        let empty = BlockData::default();
        let nonempty = BlockData::new(vec![vec![0]]);
        assert_ne!(empty.hash(), nonempty.hash());
    }
}
