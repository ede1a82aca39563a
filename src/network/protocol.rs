//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames tagged by `type`. Digests and
//! addresses travel as `0x`-prefixed hex strings and are parsed here,
//! before anything reaches the ballot.

use serde::{Deserialize, Serialize};

use crate::core::clock::Timestamp;
use crate::core::hash::{hash_from_hex, hash_to_hex, CommitmentHash, ZERO_HASH};
use crate::voting::{BallotEvent, BallotStatus, ParticipantId, Phase, Tally, VotingError};

/// Longest accepted secret, in bytes.
pub const MAX_SECRET_LEN: usize = 1024;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate with the server.
    Auth(AuthRequest),

    /// Submit a commitment as the authenticated participant.
    Commit(CommitRequest),

    /// Reveal a vote as the authenticated participant.
    Reveal(RevealRequest),

    /// Request the current phase.
    GetPhase,

    /// Request the current tally.
    GetTally,

    /// Request a participant's stored commitment.
    GetCommitment {
        /// Address to look up.
        participant: String,
    },

    /// Compute the commitment digest for a vote without submitting it.
    ComputeHash(RevealRequest),

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Claimed participant address (used only when the server runs without auth keys).
    #[serde(default)]
    pub participant: String,
    /// Authentication token (JWT).
    #[serde(default)]
    pub token: String,
    /// Client version for compatibility check.
    #[serde(default)]
    pub client_version: String,
}

impl AuthRequest {
    /// Parse the claimed participant address.
    pub fn participant_id(&self) -> Result<ParticipantId, ProtocolError> {
        parse_participant(&self.participant)
    }
}

/// Commitment submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    /// keccak256(pack(choice, secret)) as hex.
    pub commitment: String,
}

impl CommitRequest {
    /// Parse and validate the digest. The all-zero digest is rejected.
    pub fn commitment_hash(&self) -> Result<CommitmentHash, ProtocolError> {
        let hash = hash_from_hex(&self.commitment)
            .map_err(|e| ProtocolError::InvalidCommitment(e.to_string()))?;
        if hash == ZERO_HASH {
            return Err(ProtocolError::InvalidCommitment("zero digest".into()));
        }
        Ok(hash)
    }
}

/// Revealed vote (also used for hash computation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealRequest {
    /// The vote: `true` is yes.
    pub choice: bool,
    /// Secret chosen at commit time.
    pub secret: String,
}

impl RevealRequest {
    /// Check the secret before it is hashed.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.secret.is_empty() {
            return Err(ProtocolError::EmptySecret);
        }
        if self.secret.len() > MAX_SECRET_LEN {
            return Err(ProtocolError::SecretTooLong(self.secret.len()));
        }
        Ok(())
    }
}

/// Boundary validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Participant address is malformed.
    #[error("invalid participant: {0}")]
    InvalidParticipant(String),

    /// Commitment is malformed.
    #[error("invalid commitment: {0}")]
    InvalidCommitment(String),

    /// Secret is empty.
    #[error("secret must not be empty")]
    EmptySecret,

    /// Secret exceeds [`MAX_SECRET_LEN`].
    #[error("secret is {0} bytes, limit is {MAX_SECRET_LEN}")]
    SecretTooLong(usize),
}

/// Parse a participant address from the wire.
pub fn parse_participant(s: &str) -> Result<ParticipantId, ProtocolError> {
    s.parse()
        .map_err(|e: crate::voting::ParticipantParseError| ProtocolError::InvalidParticipant(e.to_string()))
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Commitment accepted.
    Committed(CommitReceipt),

    /// Reveal accepted.
    Revealed(RevealReceipt),

    /// Current phase.
    Phase(PhaseInfo),

    /// Current tally.
    Tally(TallyInfo),

    /// Stored commitment lookup.
    Commitment(CommitmentInfo),

    /// Computed digest.
    Hash(HashInfo),

    /// Periodic status push.
    Status(StatusUpdate),

    /// Ballot event broadcast.
    Event(VoteEvent),

    /// Error response.
    Error(ServerError),

    /// Pong response.
    Pong {
        /// Timestamp from the ping.
        timestamp: u64,
        /// Server clock (unix seconds).
        server_time: u64,
    },

    /// Server is shutting down.
    Shutdown {
        /// Why the server is going away.
        reason: String,
    },
}

/// Authentication result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Authenticated participant address.
    pub participant: Option<String>,
    /// Connection identifier.
    pub connection_id: Option<String>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Error code if failed.
    #[serde(default)]
    pub error_code: Option<ErrorCode>,
    /// Server version.
    pub server_version: String,
}

/// Accepted commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// Committing participant.
    pub participant: String,
    /// Stored digest.
    pub commitment: String,
}

/// Accepted reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealReceipt {
    /// Revealing participant.
    pub participant: String,
    /// Counted choice.
    pub choice: bool,
    /// Tally after counting.
    pub tally: TallyInfo,
}

/// Phase report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseInfo {
    /// Current phase.
    pub phase: Phase,
    /// Server clock (unix seconds).
    pub server_time: Timestamp,
    /// End of the current phase; absent once ended.
    pub phase_deadline: Option<Timestamp>,
    /// Seconds left in the current phase.
    pub seconds_remaining: Option<u64>,
}

/// Tally report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyInfo {
    /// Revealed yes votes.
    pub yes_votes: u64,
    /// Revealed no votes.
    pub no_votes: u64,
}

impl From<Tally> for TallyInfo {
    fn from(tally: Tally) -> Self {
        Self {
            yes_votes: tally.yes_votes,
            no_votes: tally.no_votes,
        }
    }
}

/// Commitment lookup result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentInfo {
    /// Queried participant.
    pub participant: String,
    /// Stored digest, if any.
    pub commitment: Option<String>,
    /// Whether the participant has revealed.
    pub revealed: bool,
}

/// Computed digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashInfo {
    /// Hashed choice.
    pub choice: bool,
    /// keccak256(pack(choice, secret)).
    pub commitment: String,
}

/// Periodic status push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Current phase.
    pub phase: Phase,
    /// Current tally.
    pub tally: TallyInfo,
    /// Server clock (unix seconds).
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

impl From<BallotStatus> for StatusUpdate {
    fn from(status: BallotStatus) -> Self {
        Self {
            phase: status.phase,
            tally: status.tally.into(),
            server_time: status.server_time,
            commit_end: status.commit_end,
            reveal_end: status.reveal_end,
            seconds_remaining: status.seconds_remaining,
            participants: status.participants,
        }
    }
}

/// Ballot events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VoteEvent {
    /// A participant committed.
    VoteCommitted {
        /// Committing participant.
        participant: String,
        /// Stored digest.
        commitment: String,
        /// Server time of the commit.
        at: Timestamp,
    },

    /// A participant revealed.
    VoteRevealed {
        /// Revealing participant.
        participant: String,
        /// Counted choice.
        choice: bool,
        /// Yes votes after counting.
        yes_votes: u64,
        /// No votes after counting.
        no_votes: u64,
        /// Server time of the reveal.
        at: Timestamp,
    },

    /// The phase advanced.
    PhaseChanged {
        /// Phase that ended.
        from: Phase,
        /// Phase that began.
        to: Phase,
        /// Server time the change was observed.
        at: Timestamp,
    },
}

impl From<&BallotEvent> for VoteEvent {
    fn from(event: &BallotEvent) -> Self {
        match event {
            BallotEvent::VoteCommitted { participant, commitment, at } => VoteEvent::VoteCommitted {
                participant: participant.to_hex(),
                commitment: hash_to_hex(commitment),
                at: *at,
            },
            BallotEvent::VoteRevealed { participant, choice, tally, at } => VoteEvent::VoteRevealed {
                participant: participant.to_hex(),
                choice: *choice,
                yes_votes: tally.yes_votes,
                no_votes: tally.no_votes,
                at: *at,
            },
            BallotEvent::PhaseChanged { from, to, at } => VoteEvent::PhaseChanged {
                from: *from,
                to: *to,
                at: *at,
            },
        }
    }
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error with a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&VotingError> for ServerError {
    fn from(err: &VotingError) -> Self {
        Self::new(ErrorCode::from(err), err.to_string())
    }
}

impl From<&ProtocolError> for ServerError {
    fn from(err: &ProtocolError) -> Self {
        Self::new(ErrorCode::InvalidInput, err.to_string())
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Operation outside its phase window.
    WrongPhase,
    /// Participant already committed.
    AlreadyCommitted,
    /// Participant already revealed.
    AlreadyRevealed,
    /// Reveal without commitment.
    NoCommitment,
    /// Reveal does not match commitment.
    CommitmentMismatch,
    /// Authentication failed.
    AuthFailed,
    /// Not authenticated.
    NotAuthenticated,
    /// JWT token has expired.
    TokenExpired,
    /// Invalid JWT token (signature, format, claims).
    InvalidToken,
    /// Invalid input.
    InvalidInput,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl From<&VotingError> for ErrorCode {
    fn from(err: &VotingError) -> Self {
        match err {
            VotingError::WrongPhase { .. } => ErrorCode::WrongPhase,
            VotingError::AlreadyCommitted(_) => ErrorCode::AlreadyCommitted,
            VotingError::AlreadyRevealed(_) => ErrorCode::AlreadyRevealed,
            VotingError::NoCommitment(_) => ErrorCode::NoCommitment,
            VotingError::CommitmentMismatch(_) => ErrorCode::CommitmentMismatch,
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::compute_commitment;

    const ADDR: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

    #[test]
    fn test_client_wire_format() {
        let commit = ClientMessage::from_json(
            r#"{"type":"commit","commitment":"0xe6d33e5bd34fcfb4e928db45bfe62c08223f4600666ce13df6372bd5f88b0433"}"#,
        )
        .unwrap();
        match commit {
            ClientMessage::Commit(req) => {
                assert_eq!(req.commitment_hash().unwrap(), compute_commitment(true, "abc"));
            }
            other => panic!("Wrong message type: {:?}", other),
        }

        let reveal = ClientMessage::from_json(r#"{"type":"reveal","choice":false,"secret":"xyz"}"#).unwrap();
        assert!(matches!(reveal, ClientMessage::Reveal(RevealRequest { choice: false, .. })));

        let phase = ClientMessage::from_json(r#"{"type":"get_phase"}"#).unwrap();
        assert!(matches!(phase, ClientMessage::GetPhase));

        let lookup = ClientMessage::from_json(&format!(
            r#"{{"type":"get_commitment","participant":"{}"}}"#,
            ADDR
        ))
        .unwrap();
        assert!(matches!(lookup, ClientMessage::GetCommitment { .. }));
    }

    #[test]
    fn test_auth_defaults() {
        let msg = ClientMessage::from_json(&format!(r#"{{"type":"auth","participant":"{}"}}"#, ADDR)).unwrap();
        if let ClientMessage::Auth(auth) = msg {
            assert!(auth.token.is_empty());
            assert_eq!(auth.participant_id().unwrap().to_hex(), ADDR);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_commitment_validation() {
        let zero = CommitRequest { commitment: format!("0x{}", "00".repeat(32)) };
        assert!(matches!(zero.commitment_hash(), Err(ProtocolError::InvalidCommitment(_))));

        let short = CommitRequest { commitment: "0x1234".into() };
        assert!(matches!(short.commitment_hash(), Err(ProtocolError::InvalidCommitment(_))));
    }

    #[test]
    fn test_secret_validation() {
        let empty = RevealRequest { choice: true, secret: String::new() };
        assert_eq!(empty.validate(), Err(ProtocolError::EmptySecret));

        let long = RevealRequest { choice: true, secret: "x".repeat(MAX_SECRET_LEN + 1) };
        assert_eq!(long.validate(), Err(ProtocolError::SecretTooLong(MAX_SECRET_LEN + 1)));

        let ok = RevealRequest { choice: true, secret: "abc".into() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_participant_parse() {
        assert!(parse_participant(ADDR).is_ok());
        assert!(matches!(parse_participant("bob"), Err(ProtocolError::InvalidParticipant(_))));
    }

    #[test]
    fn test_server_message_json() {
        let msg = ServerMessage::Phase(PhaseInfo {
            phase: Phase::Reveal,
            server_time: 1_700_000_121,
            phase_deadline: Some(1_700_000_240),
            seconds_remaining: Some(119),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"phase""#));
        assert!(json.contains(r#""phase":"reveal""#));

        let parsed = ServerMessage::from_json(&json).unwrap();
        assert!(matches!(parsed, ServerMessage::Phase(PhaseInfo { phase: Phase::Reveal, .. })));
    }

    #[test]
    fn test_event_conversion() {
        let participant: ParticipantId = ADDR.parse().unwrap();
        let event = BallotEvent::VoteRevealed {
            participant,
            choice: true,
            tally: Tally { yes_votes: 3, no_votes: 1 },
            at: 99,
        };

        let json = ServerMessage::Event(VoteEvent::from(&event)).to_json().unwrap();
        assert!(json.contains(r#""event":"vote_revealed""#));
        assert!(json.contains(ADDR));
        assert!(json.contains(r#""yes_votes":3"#));
    }

    #[test]
    fn test_error_codes() {
        let participant = ParticipantId::new([1; 20]);
        let cases = [
            (VotingError::WrongPhase { expected: Phase::Commit, actual: Phase::Ended }, "wrong_phase"),
            (VotingError::AlreadyCommitted(participant), "already_committed"),
            (VotingError::AlreadyRevealed(participant), "already_revealed"),
            (VotingError::NoCommitment(participant), "no_commitment"),
            (VotingError::CommitmentMismatch(participant), "commitment_mismatch"),
        ];

        for (err, code) in cases {
            let json = ServerMessage::Error(ServerError::from(&err)).to_json().unwrap();
            assert!(json.contains(&format!(r#""code":"{}""#, code)), "{}", json);
            assert_eq!(err.kind(), code);
        }
    }
}
