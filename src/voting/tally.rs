//! Tally Store
//!
//! Running yes/no counters. Only the reveal success path writes here.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Snapshot of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Revealed "yes" votes.
    pub yes_votes: u64,
    /// Revealed "no" votes.
    pub no_votes: u64,
}

impl Tally {
    /// Total revealed votes.
    pub fn total(&self) -> u64 {
        self.yes_votes + self.no_votes
    }
}

/// Shared counters.
///
/// Both counters sit behind one lock so a read never observes a torn pair.
#[derive(Debug, Default)]
pub struct TallyStore {
    counts: Mutex<Tally>,
}

impl TallyStore {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, Tally> {
        // Counter updates cannot panic mid-write, so a poisoned value is still whole.
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one "yes" vote.
    pub fn increment_yes(&self) {
        self.counts().yes_votes += 1;
    }

    /// Add one "no" vote.
    pub fn increment_no(&self) {
        self.counts().no_votes += 1;
    }

    /// Add one vote for `choice` and return the updated snapshot.
    pub fn record(&self, choice: bool) -> Tally {
        let mut counts = self.counts();
        if choice {
            counts.yes_votes += 1;
        } else {
            counts.no_votes += 1;
        }
        *counts
    }

    /// Current snapshot. Always allowed, regardless of phase.
    pub fn get_tally(&self) -> Tally {
        *self.counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let store = TallyStore::new();
        assert_eq!(store.get_tally(), Tally::default());
        assert_eq!(store.get_tally().total(), 0);
    }

    #[test]
    fn test_increments() {
        let store = TallyStore::new();
        store.increment_yes();
        store.increment_yes();
        store.increment_no();

        let tally = store.get_tally();
        assert_eq!(tally.yes_votes, 2);
        assert_eq!(tally.no_votes, 1);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_record_returns_updated_snapshot() {
        let store = TallyStore::new();
        assert_eq!(store.record(true), Tally { yes_votes: 1, no_votes: 0 });
        assert_eq!(store.record(false), Tally { yes_votes: 1, no_votes: 1 });
        assert_eq!(store.get_tally(), Tally { yes_votes: 1, no_votes: 1 });
    }
}
