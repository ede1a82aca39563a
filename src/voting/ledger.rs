//! Commitment Ledger
//!
//! One record per participant. A record is created by the participant's
//! single accepted commitment and is never replaced or removed.
//!
//! Locking: commit uniqueness is checked and set under the map write lock,
//! which is held only for the lookup and insert. The reveal flag is checked
//! and set under the record's own mutex, so participants never wait on each
//! other's hash verification.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::clock::Timestamp;
use crate::core::hash::CommitmentHash;
use crate::voting::error::VotingError;
use crate::voting::participant::ParticipantId;
use crate::voting::phase::Phase;

/// Per-participant state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    /// Digest submitted during the commit phase.
    pub commitment: CommitmentHash,
    /// When the commitment was accepted.
    pub committed_at: Timestamp,
    /// Set once by a successful reveal. Never cleared.
    pub revealed: bool,
}

/// Shared handle to one participant's record.
pub(crate) type RecordHandle = Arc<Mutex<VoterRecord>>;

/// Lock a record, recovering from poisoning.
///
/// Record writes are single-field stores, so a poisoned record is never half-written.
pub(crate) fn lock_record(record: &Mutex<VoterRecord>) -> MutexGuard<'_, VoterRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Participant → commitment map.
#[derive(Debug, Default)]
pub struct CommitmentLedger {
    records: RwLock<BTreeMap<ParticipantId, RecordHandle>>,
}

impl CommitmentLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `participant`'s commitment.
    ///
    /// A participant that already holds a commitment gets `AlreadyCommitted`
    /// in every phase. Anyone else gets `WrongPhase` outside the commit window.
    pub fn submit_commitment(
        &self,
        participant: ParticipantId,
        digest: CommitmentHash,
        phase: Phase,
        now: Timestamp,
    ) -> Result<(), VotingError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        if records.contains_key(&participant) {
            return Err(VotingError::AlreadyCommitted(participant));
        }

        if phase != Phase::Commit {
            return Err(VotingError::WrongPhase {
                expected: Phase::Commit,
                actual: phase,
            });
        }

        records.insert(
            participant,
            Arc::new(Mutex::new(VoterRecord {
                commitment: digest,
                committed_at: now,
                revealed: false,
            })),
        );
        debug!("Stored commitment for {} ({} total)", participant.short(), records.len());

        Ok(())
    }

    /// Stored commitment, if any.
    pub fn get_commitment(&self, participant: &ParticipantId) -> Option<CommitmentHash> {
        self.get_record(participant).map(|record| record.commitment)
    }

    /// Copy of the participant's record, if any.
    pub fn get_record(&self, participant: &ParticipantId) -> Option<VoterRecord> {
        let handle = self.record(participant)?;
        let record = *lock_record(&handle);
        Some(record)
    }

    /// Whether the participant has revealed.
    pub fn has_revealed(&self, participant: &ParticipantId) -> bool {
        self.get_record(participant)
            .map(|record| record.revealed)
            .unwrap_or(false)
    }

    /// Number of participants holding a commitment.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nobody has committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared handle to the participant's record, for the reveal path.
    pub(crate) fn record(&self, participant: &ParticipantId) -> Option<RecordHandle> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(participant).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::compute_commitment;

    fn voter(n: u8) -> ParticipantId {
        ParticipantId::new([n; 20])
    }

    #[test]
    fn test_submit_and_get() {
        let ledger = CommitmentLedger::new();
        let digest = compute_commitment(true, "abc");

        assert!(ledger.is_empty());
        assert_eq!(ledger.get_commitment(&voter(1)), None);

        ledger.submit_commitment(voter(1), digest, Phase::Commit, 10).unwrap();

        assert_eq!(ledger.get_commitment(&voter(1)), Some(digest));
        assert_eq!(ledger.len(), 1);

        let record = ledger.get_record(&voter(1)).unwrap();
        assert_eq!(record.committed_at, 10);
        assert!(!record.revealed);
        assert!(!ledger.has_revealed(&voter(1)));
    }

    #[test]
    fn test_recommit_rejected_and_original_kept() {
        let ledger = CommitmentLedger::new();
        let first = compute_commitment(true, "abc");
        let second = compute_commitment(false, "abc");

        ledger.submit_commitment(voter(1), first, Phase::Commit, 0).unwrap();
        let result = ledger.submit_commitment(voter(1), second, Phase::Commit, 1);

        assert_eq!(result, Err(VotingError::AlreadyCommitted(voter(1))));
        assert_eq!(ledger.get_commitment(&voter(1)), Some(first));
    }

    #[test]
    fn test_recommit_rejected_in_any_phase() {
        let ledger = CommitmentLedger::new();
        let digest = compute_commitment(true, "abc");
        ledger.submit_commitment(voter(1), digest, Phase::Commit, 0).unwrap();

        for phase in [Phase::Commit, Phase::Reveal, Phase::Ended] {
            assert_eq!(
                ledger.submit_commitment(voter(1), digest, phase, 0),
                Err(VotingError::AlreadyCommitted(voter(1)))
            );
        }
    }

    #[test]
    fn test_commit_outside_window_rejected() {
        let ledger = CommitmentLedger::new();
        let digest = compute_commitment(true, "abc");

        assert_eq!(
            ledger.submit_commitment(voter(2), digest, Phase::Reveal, 0),
            Err(VotingError::WrongPhase { expected: Phase::Commit, actual: Phase::Reveal })
        );
        assert_eq!(ledger.get_commitment(&voter(2)), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_concurrent_commits_one_winner_per_key() {
        let ledger = Arc::new(CommitmentLedger::new());

        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    // Two threads race for each of eight participants
                    let digest = compute_commitment(i % 2 == 0, "race");
                    ledger.submit_commitment(voter(i / 2), digest, Phase::Commit, 0).is_ok()
                })
            })
            .collect();

        let accepted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(accepted, 8);
        assert_eq!(ledger.len(), 8);
    }
}
