use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};

use velum_primitives::buf::Buf32;
use velum_primitives::params::GenesisParams;

use crate::validator::ValidatorSet;

/// The node's canonical chain-position record.
///
/// `last_block_height == 0` exactly when no block has been accepted yet.  Once
/// a block has been accepted, every subsequent accepted block advances the
/// height by exactly 1.
#[derive(Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize)]
pub struct ChainState {
    chain_id: String,
    initial_height: u64,
    last_block_height: u64,

    validators: ValidatorSet,
    next_validators: ValidatorSet,
    last_validators: ValidatorSet,
}

impl ChainState {
    pub fn new(
        chain_id: String,
        initial_height: u64,
        last_block_height: u64,
        validators: ValidatorSet,
        next_validators: ValidatorSet,
        last_validators: ValidatorSet,
    ) -> Self {
        Self {
            chain_id,
            initial_height,
            last_block_height,
            validators,
            next_validators,
            last_validators,
        }
    }

    /// Derives the fresh-chain state from genesis.  The sequencer key is the
    /// only member of every validator set snapshot.
    pub fn from_genesis(genesis: &GenesisParams, sequencer_pubkey: Buf32) -> Self {
        let vs = ValidatorSet::single(sequencer_pubkey);
        Self {
            chain_id: genesis.chain_id.clone(),
            initial_height: genesis.initial_height,
            last_block_height: 0,
            validators: vs.clone(),
            next_validators: vs.clone(),
            last_validators: vs,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn initial_height(&self) -> u64 {
        self.initial_height
    }

    pub fn last_block_height(&self) -> u64 {
        self.last_block_height
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    pub fn next_validators(&self) -> &ValidatorSet {
        &self.next_validators
    }

    pub fn last_validators(&self) -> &ValidatorSet {
        &self.last_validators
    }

    /// The height the next accepted block must have.
    pub fn next_block_height(&self) -> u64 {
        if self.last_block_height == 0 {
            self.initial_height
        } else {
            self.last_block_height + 1
        }
    }

    /// Returns the state that results from accepting a block at `height`,
    /// rotating the validator snapshots forward.
    pub fn advance(&self, height: u64) -> Self {
        let mut next = self.clone();
        next.last_block_height = height;
        next.last_validators = self.validators.clone();
        next.validators = self.next_validators.clone();
        next
    }
}
