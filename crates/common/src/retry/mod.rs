//! Retry backoff policies for loops that talk to flaky external services.
//!
//! The loops themselves drive the retries (they need to interleave shutdown
//! checks between attempts), so this module only supplies the delay schedule.

pub mod policies;

/// Default number of attempts a loop makes against the DA layer before giving
/// up on the current iteration and waiting for the next tick.
pub const DEFAULT_DA_MAX_RETRIES: u16 = 5;

pub trait Backoff {
    /// Base delay in ms.
    fn base_delay_ms(&self) -> u64;

    /// Generates next delay given current delay.
    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64;

    /// Iterator over the full delay schedule, starting at the base delay.
    fn delays_ms(&self) -> DelaySchedule<'_, Self>
    where
        Self: Sized,
    {
        DelaySchedule {
            backoff: self,
            next: None,
        }
    }
}

/// Infinite iterator yielding successive delays of a [`Backoff`] policy.
pub struct DelaySchedule<'a, B: Backoff> {
    backoff: &'a B,
    next: Option<u64>,
}

impl<'a, B: Backoff> Iterator for DelaySchedule<'a, B> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let cur = match self.next {
            None => self.backoff.base_delay_ms(),
            Some(prev) => self.backoff.next_delay_ms(prev),
        };
        self.next = Some(cur);
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::policies::ExponentialBackoff;
    use super::*;

    #[test]
    fn test_delay_schedule() {
        let backoff = ExponentialBackoff::new(100, 2, 1, 1000);
        let delays: Vec<_> = backoff.delays_ms().take(6).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }
}
