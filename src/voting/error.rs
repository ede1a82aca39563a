//! Voting errors.
//!
//! Every failure is recoverable by the caller; none leaves the ballot in a
//! partially updated state.

use crate::voting::participant::ParticipantId;
use crate::voting::phase::Phase;

/// Rejected commit or reveal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VotingError {
    /// Operation attempted outside its phase window.
    #[error("wrong phase: expected {expected}, ballot is in {actual}")]
    WrongPhase {
        /// Phase the operation requires.
        expected: Phase,
        /// Phase at the time of the call.
        actual: Phase,
    },

    /// Participant already holds a commitment.
    #[error("participant {0} has already committed")]
    AlreadyCommitted(ParticipantId),

    /// Participant already revealed.
    #[error("participant {0} has already revealed")]
    AlreadyRevealed(ParticipantId),

    /// Reveal without a prior commitment.
    #[error("participant {0} has no commitment")]
    NoCommitment(ParticipantId),

    /// Revealed vote does not hash to the stored commitment.
    #[error("revealed vote does not match commitment of {0}")]
    CommitmentMismatch(ParticipantId),
}

impl VotingError {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WrongPhase { .. } => "wrong_phase",
            Self::AlreadyCommitted(_) => "already_committed",
            Self::AlreadyRevealed(_) => "already_revealed",
            Self::NoCommitment(_) => "no_commitment",
            Self::CommitmentMismatch(_) => "commitment_mismatch",
        }
    }
}
