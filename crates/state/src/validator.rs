use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};

use velum_primitives::buf::{Buf20, Buf32};
use velum_primitives::crypto::compute_address;

/// A single validator identity, a schnorr x-only pubkey plus its derived
/// short address.
#[derive(Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize)]
pub struct Validator {
    pubkey: Buf32,
    address: Buf20,
}

impl Validator {
    pub fn from_pubkey(pubkey: Buf32) -> Self {
        let address = compute_address(&pubkey);
        Self { pubkey, address }
    }

    pub fn pubkey(&self) -> &Buf32 {
        &self.pubkey
    }

    pub fn address(&self) -> &Buf20 {
        &self.address
    }
}

/// Snapshot of the validator set at some height.  In this single-sequencer
/// design this is used purely for block authorization checks, never for
/// multi-party voting.
#[derive(Clone, Debug, Eq, PartialEq, Arbitrary, BorshDeserialize, BorshSerialize)]
pub struct ValidatorSet {
    proposer: Validator,
    validators: Vec<Validator>,
}

impl ValidatorSet {
    pub fn new(proposer: Validator, validators: Vec<Validator>) -> Self {
        Self {
            proposer,
            validators,
        }
    }

    /// Constructs the degenerate single-member set used by a sequencer-only
    /// chain.
    pub fn single(pubkey: Buf32) -> Self {
        let v = Validator::from_pubkey(pubkey);
        Self {
            proposer: v.clone(),
            validators: vec![v],
        }
    }

    pub fn proposer(&self) -> &Validator {
        &self.proposer
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_set_proposer() {
        let pk = Buf32::from([5; 32]);
        let vs = ValidatorSet::single(pk);
        assert_eq!(vs.proposer().pubkey(), &pk);
        assert_eq!(vs.validators().len(), 1);
        assert_eq!(vs.proposer().address(), &compute_address(&pk));
    }
}
