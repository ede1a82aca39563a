//! Participant Identity
//!
//! 20-byte account address. Parsed once at the boundary; everything past
//! that point works with the fixed-width value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Unique participant identifier (address as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub [u8; ADDRESS_LEN]);

impl ParticipantId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Errors parsing a participant address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParticipantParseError {
    /// Missing `0x` prefix.
    #[error("address must start with 0x")]
    MissingPrefix,

    /// Not valid hexadecimal.
    #[error("address is not valid hex")]
    InvalidHex,

    /// Wrong number of bytes.
    #[error("address must be {ADDRESS_LEN} bytes, got {0}")]
    WrongLength(usize),
}

impl FromStr for ParticipantId {
    type Err = ParticipantParseError;

    /// Parse `0x` + 40 hex digits. Case-insensitive; checksums are not enforced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(ParticipantParseError::MissingPrefix)?;
        let bytes = hex::decode(digits).map_err(|_| ParticipantParseError::InvalidHex)?;
        if bytes.len() != ADDRESS_LEN {
            return Err(ParticipantParseError::WrongLength(bytes.len()));
        }
        let mut id = [0u8; ADDRESS_LEN];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}
