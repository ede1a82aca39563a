//! Phase Clock
//!
//! The phase is a pure function of `now` and the fixed configuration:
//!
//! ```text
//!  start           commit_end            reveal_end
//!    │── Commit ──────│── Reveal ──────────│── Ended ──▶
//! ```
//!
//! Intervals are half-open; a boundary instant belongs to the later phase.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::clock::Timestamp;

/// Ballot phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Accepting commitments.
    Commit,
    /// Accepting reveals.
    Reveal,
    /// Read-only.
    Ended,
}

impl Phase {
    /// The phase that follows this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Commit => Some(Phase::Reveal),
            Phase::Reveal => Some(Phase::Ended),
            Phase::Ended => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Commit => "Commit",
            Phase::Reveal => "Reveal",
            Phase::Ended => "Ended",
        })
    }
}

/// Phase timing, fixed at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Instant the ballot was initialized.
    pub start_time: Timestamp,
    /// Length of the commit window (seconds).
    pub commit_duration: u64,
    /// Length of the reveal window (seconds).
    pub reveal_duration: u64,
}

impl PhaseConfig {
    /// Create a config starting at `start_time`.
    pub const fn new(start_time: Timestamp, commit_duration: u64, reveal_duration: u64) -> Self {
        Self {
            start_time,
            commit_duration,
            reveal_duration,
        }
    }

    /// First instant of the reveal phase.
    #[inline]
    pub fn commit_end(&self) -> Timestamp {
        self.start_time.saturating_add(self.commit_duration)
    }

    /// First instant of the ended phase.
    #[inline]
    pub fn reveal_end(&self) -> Timestamp {
        self.commit_end().saturating_add(self.reveal_duration)
    }

    /// Phase at `now`.
    pub fn phase_at(&self, now: Timestamp) -> Phase {
        if now < self.commit_end() {
            Phase::Commit
        } else if now < self.reveal_end() {
            Phase::Reveal
        } else {
            Phase::Ended
        }
    }

    /// End instant of the phase active at `now`; `None` once ended.
    pub fn phase_deadline(&self, now: Timestamp) -> Option<Timestamp> {
        match self.phase_at(now) {
            Phase::Commit => Some(self.commit_end()),
            Phase::Reveal => Some(self.reveal_end()),
            Phase::Ended => None,
        }
    }

    /// Seconds until the current phase ends; `None` once ended.
    pub fn seconds_remaining(&self, now: Timestamp) -> Option<u64> {
        self.phase_deadline(now).map(|deadline| deadline - now)
    }
}
