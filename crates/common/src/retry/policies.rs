use super::Backoff;

/// Exponential backoff with a fixed-point multiplier and a hard cap.
///
/// The multiplier is expressed as a ratio (`multiplier / multiplier_base`) to
/// avoid floating-point math; `150 / 100` is a 1.5x growth per attempt.
pub struct ExponentialBackoff {
    /// Initial delay before the first retry, in milliseconds.
    base_delay_ms: u64,

    /// Numerator of the backoff multiplier.
    multiplier: u64,

    /// Denominator of the backoff multiplier.
    multiplier_base: u64,

    /// Upper bound on any single delay, in milliseconds.
    cap_ms: u64,
}

impl ExponentialBackoff {
    pub fn new(base_delay_ms: u64, multiplier: u64, multiplier_base: u64, cap_ms: u64) -> Self {
        assert!(multiplier_base != 0);
        Self {
            base_delay_ms,
            multiplier,
            multiplier_base,
            cap_ms,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        // 100ms doubling up to 10s, no jitter.  Liveness-only tuning; a
        // single producer cannot thundering-herd its own DA endpoint.
        Self {
            base_delay_ms: 100,
            multiplier: 2,
            multiplier_base: 1,
            cap_ms: 10_000,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms.min(self.cap_ms)
    }

    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64 {
        (curr_delay_ms * self.multiplier / self.multiplier_base).min(self.cap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_and_cap() {
        let backoff = ExponentialBackoff::new(1000, 15, 10, 2000);
        assert_eq!(backoff.base_delay_ms(), 1000);
        assert_eq!(backoff.next_delay_ms(1000), 1500);
        assert_eq!(backoff.next_delay_ms(1500), 2000);
        assert_eq!(backoff.next_delay_ms(2000), 2000);
    }

    #[test]
    fn test_base_capped() {
        let backoff = ExponentialBackoff::new(5000, 2, 1, 1000);
        assert_eq!(backoff.base_delay_ms(), 1000);
    }
}
