//! Ballot Events
//!
//! Emitted for every successful state change and for observed phase
//! transitions. The network layer broadcasts them to connected clients.

use serde::{Deserialize, Serialize};

use crate::core::clock::Timestamp;
use crate::core::hash::CommitmentHash;
use crate::voting::participant::ParticipantId;
use crate::voting::phase::Phase;
use crate::voting::tally::Tally;

/// Ballot event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotEvent {
    /// Commitment accepted
    VoteCommitted {
        /// Who committed.
        participant: ParticipantId,
        /// Stored digest.
        commitment: CommitmentHash,
        /// Commit time.
        at: Timestamp,
    },

    /// Reveal accepted and counted
    VoteRevealed {
        /// Who revealed.
        participant: ParticipantId,
        /// Counted choice.
        choice: bool,
        /// Tally right after this vote was counted.
        tally: Tally,
        /// Reveal time.
        at: Timestamp,
    },

    /// Phase moved forward
    PhaseChanged {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
        /// Time the change was observed.
        at: Timestamp,
    },
}

impl BallotEvent {
    /// Time the event was recorded.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::VoteCommitted { at, .. }
            | Self::VoteRevealed { at, .. }
            | Self::PhaseChanged { at, .. } => *at,
        }
    }

    /// Participant involved, if any.
    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Self::VoteCommitted { participant, .. } | Self::VoteRevealed { participant, .. } => {
                Some(*participant)
            }
            Self::PhaseChanged { .. } => None,
        }
    }
}
