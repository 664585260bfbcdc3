//! Fixtures for chains, keys, and signed blocks.

use rand::rngs::OsRng;
use secp256k1::{Secp256k1, SecretKey};

use velum_primitives::buf::{Buf32, Buf64};
use velum_primitives::crypto::{compute_address, derive_xonly_pubkey, sign_schnorr_sig};
use velum_primitives::params::GenesisParams;
use velum_state::block::{Block, BlockData, BlockHeader, Commit};
use velum_state::chain_state::ChainState;
use velum_state::validator::ValidatorSet;

/// Generates a fresh schnorr keypair as `(secret, xonly_pubkey)` bufs.
pub fn gen_keypair() -> (Buf32, Buf32) {
    let secp = Secp256k1::new();
    let sk = SecretKey::new(&mut OsRng);
    let (pk, _) = sk.x_only_public_key(&secp);
    (Buf32::from(sk.secret_bytes()), Buf32::from(pk.serialize()))
}

/// A fresh-chain state with the given sequencer key as sole validator.
pub fn make_genesis_state(chain_id: &str, initial_height: u64, sequencer_pk: Buf32) -> ChainState {
    ChainState::from_genesis(&GenesisParams::new(chain_id, initial_height), sequencer_pk)
}

/// A chain state positioned at an arbitrary height with a random validator
/// set.
pub fn make_state_at(chain_id: &str, initial_height: u64, last_block_height: u64) -> ChainState {
    let (_, pk) = gen_keypair();
    let vs = ValidatorSet::single(pk);
    ChainState::new(
        chain_id.to_owned(),
        initial_height,
        last_block_height,
        vs.clone(),
        vs.clone(),
        vs,
    )
}

/// Builds a correctly signed block on top of `state`, using `sk` as the
/// proposer key.  The proposer key must match the state's proposer for the
/// block to validate.
pub fn make_signed_block(
    state: &ChainState,
    prev_block_hash: Buf32,
    txs: Vec<Vec<u8>>,
    sk: &Buf32,
) -> Block {
    let pk = derive_xonly_pubkey(sk);
    let data = BlockData::new(txs);
    let header = BlockHeader::new(
        state.next_block_height(),
        1_700_000_000_000,
        prev_block_hash,
        data.hash(),
        Buf32::zero(),
        compute_address(&pk),
    );
    let header_hash = header.hash();
    let sig = sign_schnorr_sig(&header_hash, sk);
    let commit = Commit::new(header.height(), header_hash, sig);
    Block::new(header, data, commit)
}

/// Builds a block whose commit signature is garbage.
pub fn make_forged_block(state: &ChainState, prev_block_hash: Buf32) -> Block {
    let (sk, pk) = gen_keypair();
    let data = BlockData::new(vec![vec![0xde, 0xad]]);
    let header = BlockHeader::new(
        state.next_block_height(),
        1_700_000_000_000,
        prev_block_hash,
        data.hash(),
        Buf32::zero(),
        compute_address(&pk),
    );
    let header_hash = header.hash();
    // Sign the wrong message so verification fails.
    let sig = sign_schnorr_sig(&Buf32::from([0xff; 32]), &sk);
    let commit = Commit::new(header.height(), header_hash, sig);
    Block::new(header, data, commit)
}
