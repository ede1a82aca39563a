//! Commitment Hashing
//!
//! Canonical encoding and keccak-256 hashing of `(choice, secret)` pairs.
//!
//! The packed layout matches Solidity's `abi.encodePacked(bool, string)`:
//!
//! ```text
//! ┌──────────┬──────────────────────────────┐
//! │ 1 byte   │ N bytes                      │
//! │ 0x00/01  │ secret, raw UTF-8, no prefix │
//! └──────────┴──────────────────────────────┘
//! ```
//!
//! Voters compute the digest client-side before the commit phase and the
//! ballot recomputes it during reveal. Both sides must use this exact layout.

use sha3::{Digest, Keccak256};

/// Hash output type (256 bits / 32 bytes)
pub type CommitmentHash = [u8; 32];

/// The all-zero digest. Never a valid commitment.
pub const ZERO_HASH: CommitmentHash = [0; 32];

/// Incremental keccak-256 hasher.
///
/// Order of updates is part of the encoding.
pub struct CommitmentHasher {
    hasher: Keccak256,
}

impl CommitmentHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self { hasher: Keccak256::new() }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a boolean (one byte, 0x00 or 0x01).
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.hasher.update([value as u8]);
    }

    /// Update with a string's UTF-8 bytes, unprefixed.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.hasher.update(value.as_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> CommitmentHash {
        self.hasher.finalize().into()
    }
}

impl Default for CommitmentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Packed encoding of a vote: `choice` byte followed by `secret` bytes.
pub fn pack_vote(choice: bool, secret: &str) -> Vec<u8> {
    let mut packed = Vec::with_capacity(1 + secret.len());
    packed.push(choice as u8);
    packed.extend_from_slice(secret.as_bytes());
    packed
}

/// Compute the commitment digest for a vote.
pub fn compute_commitment(choice: bool, secret: &str) -> CommitmentHash {
    let mut hasher = CommitmentHasher::new();
    hasher.update_bool(choice);
    hasher.update_str(secret);
    hasher.finalize()
}

/// Compute keccak-256 of arbitrary data.
pub fn keccak256(data: &[u8]) -> CommitmentHash {
    Keccak256::digest(data).into()
}

/// Render a digest as `0x`-prefixed lowercase hex.
pub fn hash_to_hex(hash: &CommitmentHash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Errors parsing a hex digest.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashParseError {
    /// Not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Decoded to the wrong number of bytes.
    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
}

/// Parse a 32-byte digest from hex, with or without a `0x` prefix.
pub fn hash_from_hex(s: &str) -> Result<CommitmentHash, HashParseError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed)?;
    if bytes.len() != 32 {
        return Err(HashParseError::WrongLength(bytes.len()));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty_vector() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_solidity_packed_vectors() {
        // ethers.keccak256(ethers.solidityPacked(["bool", "string"], [..]))
        assert_eq!(
            hash_to_hex(&compute_commitment(true, "abc")),
            "0xe6d33e5bd34fcfb4e928db45bfe62c08223f4600666ce13df6372bd5f88b0433"
        );
        assert_eq!(
            hash_to_hex(&compute_commitment(false, "xyz")),
            "0x293c1ceb84678df1cfc1297faaf03832245215904f82ea9129f10f3e4f27d7c4"
        );
        assert_eq!(
            hash_to_hex(&compute_commitment(false, "abc")),
            "0xc168262281c10d4285a4aecba18107ae7f43f8c07d15d2875d5f2acf1ed3d076"
        );
    }

    #[test]
    fn test_pack_layout() {
        assert_eq!(pack_vote(true, "abc"), vec![0x01, b'a', b'b', b'c']);
        assert_eq!(pack_vote(false, ""), vec![0x00]);
    }

    #[test]
    fn test_incremental_matches_packed() {
        let packed = pack_vote(true, "correct horse");
        assert_eq!(keccak256(&packed), compute_commitment(true, "correct horse"));
    }

    #[test]
    fn test_choice_changes_hash() {
        assert_ne!(compute_commitment(true, "s"), compute_commitment(false, "s"));
    }

    #[test]
    fn test_hex_parsing() {
        let hash = compute_commitment(true, "abc");
        let text = hash_to_hex(&hash);

        assert_eq!(hash_from_hex(&text).unwrap(), hash);
        assert_eq!(hash_from_hex(&text[2..]).unwrap(), hash);
        assert_eq!(hash_from_hex("0xabcd"), Err(HashParseError::WrongLength(2)));
        assert!(matches!(hash_from_hex("0xzz"), Err(HashParseError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_error_wraps_hex_error() {
        let err = hash_from_hex("0xabc").unwrap_err();
        assert_eq!(err, HashParseError::InvalidHex(hex::FromHexError::OddLength));
        assert_eq!(err.to_string(), "invalid hex: Odd number of digits");
    }
}
