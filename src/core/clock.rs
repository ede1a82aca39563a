//! Time Source
//!
//! The ballot never reads the wall clock itself. Every phase-dependent call
//! takes `now` explicitly; the network layer obtains it from a [`Clock`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Unix time in whole seconds.
pub type Timestamp = u64;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall clock (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-1970 clocks clamp to zero.
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Manually advanced clock for tests and scripted runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_700_000_000);
        assert_eq!(clock.now(), 1_700_000_000);

        clock.advance(121);
        assert_eq!(clock.now(), 1_700_000_121);

        clock.set(5);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2023-11-14, well before any plausible test run
        assert!(SystemClock.now() > 1_700_000_000);
    }
}
