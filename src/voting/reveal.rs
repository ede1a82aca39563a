//! Reveal Processor
//!
//! Verifies a revealed `(choice, secret)` against the stored commitment and,
//! on success, flips the reveal flag and counts the vote.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. phase is Reveal
//! 2. a commitment exists
//! 3. not already revealed
//! 4. `keccak256(pack(choice, secret))` equals the commitment

use tracing::debug;

use crate::core::hash::{compute_commitment, CommitmentHash};
use crate::voting::error::VotingError;
use crate::voting::ledger::{lock_record, CommitmentLedger};
use crate::voting::participant::ParticipantId;
use crate::voting::phase::Phase;
use crate::voting::tally::{Tally, TallyStore};

/// Check a revealed vote against a commitment.
pub fn verify_reveal(commitment: &CommitmentHash, choice: bool, secret: &str) -> bool {
    compute_commitment(choice, secret) == *commitment
}

/// Reveal path over a ledger and a tally.
pub struct RevealProcessor<'a> {
    ledger: &'a CommitmentLedger,
    tally: &'a TallyStore,
}

impl<'a> RevealProcessor<'a> {
    /// Bind to the ballot's ledger and tally.
    pub fn new(ledger: &'a CommitmentLedger, tally: &'a TallyStore) -> Self {
        Self { ledger, tally }
    }

    /// Process a reveal. Returns the tally after counting this vote.
    pub fn reveal(
        &self,
        participant: ParticipantId,
        choice: bool,
        secret: &str,
        phase: Phase,
    ) -> Result<Tally, VotingError> {
        if phase != Phase::Reveal {
            return Err(VotingError::WrongPhase {
                expected: Phase::Reveal,
                actual: phase,
            });
        }

        let handle = self
            .ledger
            .record(&participant)
            .ok_or(VotingError::NoCommitment(participant))?;

        // Held until the tally is updated: flag and counters move together.
        let mut record = lock_record(&handle);

        if record.revealed {
            return Err(VotingError::AlreadyRevealed(participant));
        }

        if !verify_reveal(&record.commitment, choice, secret) {
            debug!("Reveal from {} does not match its commitment", participant.short());
            return Err(VotingError::CommitmentMismatch(participant));
        }

        record.revealed = true;
        let tally = self.tally.record(choice);

        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(n: u8) -> ParticipantId {
        ParticipantId::new([n; 20])
    }

    fn setup() -> (CommitmentLedger, TallyStore) {
        let ledger = CommitmentLedger::new();
        ledger
            .submit_commitment(voter(1), compute_commitment(true, "abc"), Phase::Commit, 0)
            .unwrap();
        ledger
            .submit_commitment(voter(2), compute_commitment(false, "xyz"), Phase::Commit, 0)
            .unwrap();
        (ledger, TallyStore::new())
    }

    #[test]
    fn test_successful_reveals_update_tally() {
        let (ledger, tally) = setup();
        let processor = RevealProcessor::new(&ledger, &tally);

        let after_first = processor.reveal(voter(1), true, "abc", Phase::Reveal).unwrap();
        assert_eq!(after_first, Tally { yes_votes: 1, no_votes: 0 });

        let after_second = processor.reveal(voter(2), false, "xyz", Phase::Reveal).unwrap();
        assert_eq!(after_second, Tally { yes_votes: 1, no_votes: 1 });

        assert!(ledger.has_revealed(&voter(1)));
        assert!(ledger.has_revealed(&voter(2)));
    }

    #[test]
    fn test_replay_rejected() {
        let (ledger, tally) = setup();
        let processor = RevealProcessor::new(&ledger, &tally);

        processor.reveal(voter(1), true, "abc", Phase::Reveal).unwrap();
        assert_eq!(
            processor.reveal(voter(1), true, "abc", Phase::Reveal),
            Err(VotingError::AlreadyRevealed(voter(1)))
        );
        assert_eq!(tally.get_tally(), Tally { yes_votes: 1, no_votes: 0 });
    }

    #[test]
    fn test_no_commitment() {
        let (ledger, tally) = setup();
        let processor = RevealProcessor::new(&ledger, &tally);

        assert_eq!(
            processor.reveal(voter(3), true, "anything", Phase::Reveal),
            Err(VotingError::NoCommitment(voter(3)))
        );
    }

    #[test]
    fn test_mismatch_leaves_state_untouched() {
        let (ledger, tally) = setup();
        let processor = RevealProcessor::new(&ledger, &tally);

        assert_eq!(
            processor.reveal(voter(1), false, "abc", Phase::Reveal),
            Err(VotingError::CommitmentMismatch(voter(1)))
        );
        assert_eq!(
            processor.reveal(voter(1), true, "abd", Phase::Reveal),
            Err(VotingError::CommitmentMismatch(voter(1)))
        );
        assert!(!ledger.has_revealed(&voter(1)));
        assert_eq!(tally.get_tally().total(), 0);

        // A failed attempt does not burn the reveal
        assert!(processor.reveal(voter(1), true, "abc", Phase::Reveal).is_ok());
    }

    #[test]
    fn test_phase_checked_first() {
        let (ledger, tally) = setup();
        let processor = RevealProcessor::new(&ledger, &tally);

        // Even an unknown participant sees WrongPhase outside the reveal window
        for phase in [Phase::Commit, Phase::Ended] {
            assert_eq!(
                processor.reveal(voter(9), true, "abc", phase),
                Err(VotingError::WrongPhase { expected: Phase::Reveal, actual: phase })
            );
        }
    }

    #[test]
    fn test_already_revealed_before_mismatch() {
        let (ledger, tally) = setup();
        let processor = RevealProcessor::new(&ledger, &tally);

        processor.reveal(voter(1), true, "abc", Phase::Reveal).unwrap();
        assert_eq!(
            processor.reveal(voter(1), false, "wrong", Phase::Reveal),
            Err(VotingError::AlreadyRevealed(voter(1)))
        );
    }

    #[test]
    fn test_verify_reveal() {
        let commitment = compute_commitment(true, "abc");
        assert!(verify_reveal(&commitment, true, "abc"));
        assert!(!verify_reveal(&commitment, false, "abc"));
        assert!(!verify_reveal(&commitment, true, ""));
    }
}
