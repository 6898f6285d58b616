//! Reconnect backoff.
//!
//! The governor only does arithmetic and bookkeeping; the core owns the
//! actual timer. That keeps the delay sequence testable without a clock.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryGovernor {
    base: Duration,
    ceiling: Duration,
    retry_count: u32,
    pending: bool,
}

impl RetryGovernor {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base,
            ceiling,
            retry_count: 0,
            pending: false,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// `min(base * 2^attempt, ceiling)`, saturating instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }

    /// Record a failure. Returns the delay to wait before the single
    /// reconnect attempt, or `None` when one is already scheduled.
    pub fn on_failure(&mut self) -> Option<Duration> {
        if self.pending {
            return None;
        }
        let delay = self.delay_for(self.retry_count);
        self.retry_count = self.retry_count.saturating_add(1);
        self.pending = true;
        Some(delay)
    }

    /// The scheduled reconnect is about to run.
    pub fn fire(&mut self) {
        self.pending = false;
    }

    /// A new connect attempt supersedes the scheduled one.
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    /// Successful connect.
    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governor() -> RetryGovernor {
        RetryGovernor::new(Duration::from_millis(3000), Duration::from_millis(30000))
    }

    #[test]
    fn delay_sequence_doubles_then_caps() {
        let mut g = governor();
        let mut delays = Vec::new();
        for _ in 0..7 {
            let d = g.on_failure().unwrap();
            delays.push(d.as_millis() as u64);
            g.fire();
        }
        assert_eq!(delays, vec![3000, 6000, 12000, 24000, 30000, 30000, 30000]);
        assert_eq!(g.retry_count(), 7);
    }

    #[test]
    fn no_second_timer_while_pending() {
        let mut g = governor();
        assert!(g.on_failure().is_some());
        assert!(g.on_failure().is_none());
        assert_eq!(g.retry_count(), 1);
        g.fire();
        assert_eq!(g.on_failure(), Some(Duration::from_millis(6000)));
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut g = governor();
        g.on_failure();
        g.fire();
        g.on_failure();
        g.reset();
        assert_eq!(g.retry_count(), 0);
        assert!(!g.is_pending());
        assert_eq!(g.on_failure(), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn huge_attempt_counts_saturate_at_ceiling() {
        let g = governor();
        assert_eq!(g.delay_for(31), Duration::from_millis(30000));
        assert_eq!(g.delay_for(64), Duration::from_millis(30000));
        assert_eq!(g.delay_for(u32::MAX), Duration::from_millis(30000));
    }
}
