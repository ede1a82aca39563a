//! Network Layer
//!
//! WebSocket front end for the ballot. Everything here is I/O and
//! validation; vote semantics live in `voting/`.

pub mod auth;
pub mod protocol;
pub mod server;

pub use auth::{authenticate, validate_token, AuthConfig, AuthError, TokenClaims};
pub use protocol::{
    ClientMessage, ErrorCode, ProtocolError, ServerError, ServerMessage, StatusUpdate, VoteEvent,
};
pub use server::{ConfigError, ServerConfig, VotingServer, VotingServerError};
