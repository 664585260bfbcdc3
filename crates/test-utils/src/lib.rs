//! Helpers for constructing test fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};

use arbitrary::{Arbitrary, Unstructured};
use rand::{rngs::OsRng, RngCore};

pub mod chain;

const ARB_GEN_LEN: usize = 1 << 20; // 1 MiB

/// Source of arbitrary values backed by one random buffer, so a single
/// generator can produce many fixtures.
pub struct ArbitraryGenerator {
    buf: Vec<u8>,
    off: AtomicUsize,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        Self::new_with_size(ARB_GEN_LEN)
    }

    pub fn new_with_size(n: usize) -> Self {
        let mut buf = vec![0; n];
        OsRng.fill_bytes(&mut buf);
        let off = AtomicUsize::new(0);
        ArbitraryGenerator { buf, off }
    }

    pub fn generate<'a, T: Arbitrary<'a> + Clone>(&'a self) -> T {
        // Advance the offset past the consumed bytes so repeated calls yield
        // fresh values.
        let off = self.off.load(Ordering::Relaxed);
        let mut u = Unstructured::new(&self.buf[off..]);
        let prev_len = u.len();
        let inst = T::arbitrary(&mut u).expect("failed to generate arbitrary instance");
        let consumed = prev_len - u.len();
        self.off.store(off + consumed, Ordering::Relaxed);
        inst
    }
}
