//! # Commit-Reveal Voting
//!
//! Two-phase yes/no ballot. Participants first publish a keccak-256
//! commitment to `(choice, secret)`, then reveal the pair once the commit
//! window closes. Only revealed votes that match their commitment are
//! counted.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  COMMIT-REVEAL VOTING                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── hash.rs     - Packed keccak-256 commitments             │
//! │  └── clock.rs    - Injectable time source                    │
//! │                                                              │
//! │  voting/         - Ballot logic (clock-free)                 │
//! │  ├── phase.rs    - Commit / Reveal / Ended windows           │
//! │  ├── ledger.rs   - One commitment per participant            │
//! │  ├── reveal.rs   - Reveal verification                       │
//! │  ├── tally.rs    - Yes / no counters                         │
//! │  └── ballot.rs   - Public ballot API                         │
//! │                                                              │
//! │  network/        - WebSocket server                          │
//! │  ├── server.rs   - Connections, status push                  │
//! │  ├── protocol.rs - JSON message types                        │
//! │  └── auth.rs     - JWT participant binding                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Time
//!
//! `voting/` never reads a clock. Every time-dependent operation takes
//! `now` as an argument, so phase behaviour is reproducible in tests.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod network;
pub mod voting;

// Re-export commonly used types
pub use core::clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use core::hash::{compute_commitment, CommitmentHash};
pub use voting::{
    BallotConfig, BallotEvent, BallotStatus, CommitRevealBallot, ParticipantId, Phase, Tally,
    VotingError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
