//! Schnorr signing helpers for sequencer block credentials.

use secp256k1::{schnorr::Signature, Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::buf::{Buf20, Buf32, Buf64};

/// Signs the message with the given private key, returning the schnorr
/// signature.
///
/// # Panics
///
/// If the secret key or message buf are structurally invalid.
pub fn sign_schnorr_sig(msg: &Buf32, sk: &Buf32) -> Buf64 {
    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(sk.as_slice()).expect("crypto: invalid private key");
    let kp = Keypair::from_secret_key(&secp, &sk);
    let msg = Message::from_digest_slice(msg.as_slice()).expect("crypto: invalid message hash");
    let sig = secp.sign_schnorr(&msg, &kp);
    Buf64::from(sig.serialize())
}

/// Verifies a schnorr signature against a message and an x-only pubkey.
/// Structurally invalid inputs simply fail verification.
pub fn verify_schnorr_sig(sig: &Buf64, msg: &Buf32, pk: &Buf32) -> bool {
    let Ok(msg) = Message::from_digest_slice(msg.as_slice()) else {
        return false;
    };

    let Ok(pk) = XOnlyPublicKey::from_slice(pk.as_slice()) else {
        return false;
    };

    let Ok(sig) = Signature::from_slice(sig.as_slice()) else {
        return false;
    };

    sig.verify(&msg, &pk).is_ok()
}

/// Derives the x-only pubkey corresponding to a secret key.
pub fn derive_xonly_pubkey(sk: &Buf32) -> Buf32 {
    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(sk.as_slice()).expect("crypto: invalid private key");
    let (pk, _) = sk.x_only_public_key(&secp);
    Buf32::from(pk.serialize())
}

/// Computes the short address for a pubkey, the first 20 bytes of its sha256
/// hash.
pub fn compute_address(pk: &Buf32) -> Buf20 {
    let h = Sha256::digest(pk.as_slice());
    let mut buf = [0u8; 20];
    buf.copy_from_slice(&h[..20]);
    Buf20::from(buf)
}
