//! Core primitives.
//!
//! Hashing and time. Nothing in here knows about voting rules.

pub mod clock;
pub mod hash;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use hash::{compute_commitment, CommitmentHash, CommitmentHasher};
