//! Participant Authentication
//!
//! Binds a WebSocket connection to one participant address. With a key
//! configured, the address comes from a validated JWT; the server never
//! issues tokens. Without a key the server runs open and trusts the
//! address the client claims, which is only suitable for local testing.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::network::protocol::AuthRequest;
use crate::voting::participant::{ParticipantId, ADDRESS_LEN};

/// Authentication configuration.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"). If None, any audience accepted.
    pub audience: Option<String>,
    /// RS256 public key in PEM format.
    pub public_key_pem: Option<String>,
    /// HS256 shared secret.
    pub secret: Option<String>,
    /// Skip expiry validation (testing only).
    pub skip_expiry: bool,
}

impl AuthConfig {
    /// Read `AUTH_ISSUER`, `AUTH_AUDIENCE`, `AUTH_PUBLIC_KEY_PEM`,
    /// `AUTH_SECRET` and `AUTH_SKIP_EXPIRY`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            issuer: var("AUTH_ISSUER"),
            audience: var("AUTH_AUDIENCE"),
            public_key_pem: var("AUTH_PUBLIC_KEY_PEM"),
            secret: var("AUTH_SECRET"),
            skip_expiry: var("AUTH_SKIP_EXPIRY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// True when a verification key is present.
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }

    /// Algorithm and key used to verify signatures. RS256 wins over HS256.
    fn decoding_key(&self) -> Result<(Algorithm, DecodingKey), AuthError> {
        if let Some(pem) = &self.public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::DecodeError(format!("invalid public key: {}", e)))?;
            return Ok((Algorithm::RS256, key));
        }
        if let Some(secret) = &self.secret {
            return Ok((Algorithm::HS256, DecodingKey::from_secret(secret.as_bytes())));
        }
        Err(AuthError::NotConfigured)
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if self.skip_expiry {
            validation.validate_exp = false;
        }

        validation
    }
}

/// Claims read from the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: a participant address or a provider user id.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Participant identity for this token.
    ///
    /// A subject that is already a `0x` address is used as-is. Any other
    /// subject maps to the first 20 bytes of a domain-separated SHA-256.
    pub fn participant_id(&self) -> ParticipantId {
        if let Ok(address) = self.sub.parse::<ParticipantId>() {
            return address;
        }

        let mut hasher = Sha256::new();
        hasher.update(b"commit-reveal-participant:");
        hasher.update(self.sub.as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; ADDRESS_LEN];
        id.copy_from_slice(&hash[..ADDRESS_LEN]);
        ParticipantId::new(id)
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No verification key configured.
    #[error("authentication not configured")]
    NotConfigured,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer claim doesn't match.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Audience claim doesn't match.
    #[error("invalid audience")]
    InvalidAudience,
    /// Required claim is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// Claimed address is malformed (open mode).
    #[error("invalid participant address: {0}")]
    InvalidParticipant(String),
    /// JWT decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Validate a JWT and extract its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let (algorithm, key) = config.decoding_key()?;
    let validation = config.validation(algorithm);

    let claims = decode::<TokenClaims>(token, &key, &validation)
        .map_err(map_jwt_error)?
        .claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }

    // jsonwebtoken allows some leeway; enforce the exact expiry
    if !config.skip_expiry && claims.exp > 0 && unix_now() > claims.exp {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

/// Resolve the participant for an auth request.
///
/// Token mode when a key is configured, open mode otherwise.
pub fn authenticate(request: &AuthRequest, config: &AuthConfig) -> Result<ParticipantId, AuthError> {
    if config.is_configured() {
        return validate_token(&request.token, config).map(|claims| claims.participant_id());
    }

    request
        .participant_id()
        .map_err(|e| AuthError::InvalidParticipant(e.to_string()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
