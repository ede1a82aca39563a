//! Commit-Reveal Ballot
//!
//! Owns the phase configuration, the commitment ledger and the tally.
//! Created once by [`CommitRevealBallot::initialize`] and mutated only by
//! [`submit_commitment`](CommitRevealBallot::submit_commitment) and
//! [`reveal`](CommitRevealBallot::reveal).
//!
//! The ballot is `Sync`; share it behind an `Arc`. Calls never block on I/O.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::clock::Timestamp;
use crate::core::hash::{compute_commitment, CommitmentHash};
use crate::voting::error::VotingError;
use crate::voting::events::BallotEvent;
use crate::voting::ledger::CommitmentLedger;
use crate::voting::participant::ParticipantId;
use crate::voting::phase::{Phase, PhaseConfig};
use crate::voting::reveal::RevealProcessor;
use crate::voting::tally::{Tally, TallyStore};

/// Phase lengths chosen at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotConfig {
    /// Commit window (seconds).
    pub commit_duration: u64,
    /// Reveal window (seconds).
    pub reveal_duration: u64,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            commit_duration: 120,
            reveal_duration: 120,
        }
    }
}

/// Point-in-time view for polling clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotStatus {
    /// Phase at `server_time`.
    pub phase: Phase,
    /// Current counters.
    pub tally: Tally,
    /// Time the snapshot was taken.
    pub server_time: Timestamp,
    /// First instant of the reveal phase.
    pub commit_end: Timestamp,
    /// First instant of the ended phase.
    pub reveal_end: Timestamp,
    /// Seconds left in the current phase.
    pub seconds_remaining: Option<u64>,
    /// Participants holding a commitment.
    pub participants: usize,
}

/// The ballot.
#[derive(Debug)]
pub struct CommitRevealBallot {
    phase_config: PhaseConfig,
    ledger: CommitmentLedger,
    tally: TallyStore,
}

impl CommitRevealBallot {
    /// Start a ballot at `now`. The commit phase opens immediately.
    pub fn initialize(config: BallotConfig, now: Timestamp) -> Self {
        let phase_config = PhaseConfig::new(now, config.commit_duration, config.reveal_duration);
        info!(
            "Ballot initialized at {}: commit until {}, reveal until {}",
            now,
            phase_config.commit_end(),
            phase_config.reveal_end()
        );
        Self::with_phase_config(phase_config)
    }

    /// Build from an explicit phase configuration.
    pub fn with_phase_config(phase_config: PhaseConfig) -> Self {
        Self {
            phase_config,
            ledger: CommitmentLedger::new(),
            tally: TallyStore::new(),
        }
    }

    /// Fixed phase timing.
    pub fn phase_config(&self) -> &PhaseConfig {
        &self.phase_config
    }

    /// Phase at `now`.
    pub fn current_phase(&self, now: Timestamp) -> Phase {
        self.phase_config.phase_at(now)
    }

    /// Accept a commitment from `participant`.
    pub fn submit_commitment(
        &self,
        participant: ParticipantId,
        digest: CommitmentHash,
        now: Timestamp,
    ) -> Result<BallotEvent, VotingError> {
        let phase = self.current_phase(now);

        if let Err(e) = self.ledger.submit_commitment(participant, digest, phase, now) {
            debug!("Commit from {} rejected: {}", participant.short(), e);
            return Err(e);
        }

        info!("Vote committed by {}", participant);
        Ok(BallotEvent::VoteCommitted {
            participant,
            commitment: digest,
            at: now,
        })
    }

    /// Reveal and count `participant`'s vote.
    pub fn reveal(
        &self,
        participant: ParticipantId,
        choice: bool,
        secret: &str,
        now: Timestamp,
    ) -> Result<BallotEvent, VotingError> {
        let phase = self.current_phase(now);
        let processor = RevealProcessor::new(&self.ledger, &self.tally);

        let tally = match processor.reveal(participant, choice, secret, phase) {
            Ok(tally) => tally,
            Err(e) => {
                debug!("Reveal from {} rejected: {}", participant.short(), e);
                return Err(e);
            }
        };

        info!(
            "Vote revealed by {}: {} (yes={}, no={})",
            participant,
            if choice { "yes" } else { "no" },
            tally.yes_votes,
            tally.no_votes
        );
        Ok(BallotEvent::VoteRevealed {
            participant,
            choice,
            tally,
            at: now,
        })
    }

    /// Current counters.
    pub fn get_tally(&self) -> Tally {
        self.tally.get_tally()
    }

    /// Stored commitment of `participant`.
    pub fn get_commitment(&self, participant: &ParticipantId) -> Option<CommitmentHash> {
        self.ledger.get_commitment(participant)
    }

    /// Whether `participant` has revealed.
    pub fn has_revealed(&self, participant: &ParticipantId) -> bool {
        self.ledger.has_revealed(participant)
    }

    /// Number of participants holding a commitment.
    pub fn participant_count(&self) -> usize {
        self.ledger.len()
    }

    /// Number of counted reveals.
    pub fn reveal_count(&self) -> u64 {
        self.get_tally().total()
    }

    /// Digest a client should commit for `(choice, secret)`.
    pub fn compute_hash(choice: bool, secret: &str) -> CommitmentHash {
        compute_commitment(choice, secret)
    }

    /// Snapshot for polling clients.
    pub fn status(&self, now: Timestamp) -> BallotStatus {
        BallotStatus {
            phase: self.current_phase(now),
            tally: self.get_tally(),
            server_time: now,
            commit_end: self.phase_config.commit_end(),
            reveal_end: self.phase_config.reveal_end(),
            seconds_remaining: self.phase_config.seconds_remaining(now),
            participants: self.participant_count(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
