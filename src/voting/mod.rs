//! Commit-reveal voting protocol.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   CommitRevealBallot                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  phase.rs   PhaseConfig ── gates ──┬─────────────┐       │
//! │                                    ▼             ▼       │
//! │  ledger.rs  CommitmentLedger ◀── reveal.rs RevealProcessor│
//! │                                                  │       │
//! │  tally.rs   TallyStore ◀─────────────────────────┘       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All time-dependent calls take `now` explicitly; nothing here reads a clock.

pub mod ballot;
pub mod error;
pub mod events;
pub mod ledger;
pub mod participant;
pub mod phase;
pub mod reveal;
pub mod tally;

pub use ballot::{BallotConfig, BallotStatus, CommitRevealBallot};
pub use error::VotingError;
pub use events::BallotEvent;
pub use ledger::{CommitmentLedger, VoterRecord};
pub use participant::{ParticipantId, ParticipantParseError};
pub use phase::{Phase, PhaseConfig};
pub use reveal::{verify_reveal, RevealProcessor};
pub use tally::{Tally, TallyStore};
