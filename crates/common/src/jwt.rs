//! JWT utilities shared across Keygate crates.
//!
//! This module provides the token-level building blocks that do not depend on
//! any key material:
//! - Size limits for DoS prevention
//! - Clock skew and token age constants
//! - Unverified decoding of the header and payload
//! - Time claim validation (types, future `iat`, maximum age)
//! - Ed25519 public key decoding from JWK `x`
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - [`decode_unverified`] never checks a signature; its output is only used
//!   to pick candidate keys and validation constraints
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified, validate_iat_at, DEFAULT_CLOCK_SKEW};
//!
//! let decoded = decode_unverified(token)?;
//! decoded.check_time_claim_types()?;
//! if let Some(kid) = decoded.kid() {
//!     // look up the key by id
//! }
//!
//! // After signature verification
//! validate_iat_at(iat, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Header;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// - Typical JWTs are 200-500 bytes (header + claims + signature)
/// - 8KB allows for large application payloads while bounding the work an
///   attacker can force per request
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Tokens with `iat` (issued-at) timestamps more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Default maximum age for tokens that carry no `exp` claim (1 hour).
pub const DEFAULT_MAX_TOKEN_AGE: Duration = Duration::from_secs(3600);

// =============================================================================
// Error Types
// =============================================================================

/// Token-level validation failures.
///
/// None of these carry key identifiers or key material, so they are safe to
/// surface to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// A registered time claim (`exp`, `nbf`, `iat`) is not a NumericDate.
    #[error("token claims are invalid")]
    InvalidTimeClaim(&'static str),

    /// Token size exceeds maximum allowed.
    #[error("token exceeds maximum size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Token `iat` claim is too far in the future.
    #[error("token issued in the future")]
    IatTooFarInFuture,

    /// Token has neither `exp` nor `iat`, so its age cannot be bounded.
    #[error("token is missing the iat claim")]
    MissingIat,

    /// Token is older than the configured maximum age.
    #[error("token exceeds maximum age")]
    TokenTooOld,
}

// =============================================================================
// Unverified decoding
// =============================================================================

/// Header and payload of a JWT, decoded WITHOUT signature verification.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    /// Parsed JOSE header.
    pub header: Header,

    /// Payload claims as a JSON object.
    pub claims: Map<String, Value>,
}

impl DecodedToken {
    /// The `kid` header, if present and non-empty.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref().filter(|kid| !kid.is_empty())
    }

    /// Whether the payload carries a numeric `exp` claim.
    #[must_use]
    pub fn has_exp(&self) -> bool {
        numeric_claim(&self.claims, "exp").is_some()
    }

    /// Reject `exp`, `nbf` or `iat` claims that are present but not numbers.
    ///
    /// `jsonwebtoken` silently skips time claims it cannot parse, so a token
    /// with `"exp": null` would otherwise never expire.
    ///
    /// # Errors
    ///
    /// `InvalidTimeClaim` naming the first offending claim.
    pub fn check_time_claim_types(&self) -> Result<(), JwtValidationError> {
        for name in ["exp", "nbf", "iat"] {
            if self.claims.contains_key(name) && numeric_claim(&self.claims, name).is_none() {
                tracing::debug!(
                    target: "common.jwt",
                    claim = name,
                    "Token rejected: time claim is not a number"
                );
                return Err(JwtValidationError::InvalidTimeClaim(name));
            }
        }
        Ok(())
    }
}

/// Read a NumericDate claim, accepting floats as well as integers.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // NumericDate truncates to whole seconds
pub fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Option<i64> {
    let value = claims.get(name)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// Decode a JWT's header and payload without verifying its signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The result MUST only be used to select keys and constraints
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - not three parts, bad base64url, header or payload not
///   JSON, unknown algorithm, or payload not a JSON object
pub fn decode_unverified(token: &str) -> Result<DecodedToken, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken(
            "expected three dot-separated parts".to_string(),
        ));
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken("header is not base64url".to_string())
    })?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken("header is not a valid JOSE header".to_string())
    })?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtValidationError::MalformedToken("payload is not base64url".to_string())
    })?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtValidationError::MalformedToken("payload is not a JSON object".to_string())
    })?;

    Ok(DecodedToken { header, claims })
}

// =============================================================================
// Claim validation
// =============================================================================

/// Validate the `iat` (issued-at) claim against `now` with clock skew tolerance.
///
/// Rejects tokens with `iat` too far in the future, which could indicate
/// token pre-generation, clock drift or manipulation.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` past `now`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    let clock_skew_secs = duration_secs(clock_skew);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Validate that a token issued at `iat` is no older than `max_age` at `now`.
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooOld` once `now - iat` exceeds `max_age`.
pub fn validate_max_age_at(
    iat: i64,
    max_age: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let max_age_secs = duration_secs(max_age);
    let age = now.saturating_sub(iat);

    if age > max_age_secs {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            age_secs = age,
            max_age_secs = max_age_secs,
            "Token rejected: older than maximum age"
        );
        return Err(JwtValidationError::TokenTooOld);
    }

    Ok(())
}

fn duration_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

// =============================================================================
// Key decoding
// =============================================================================

/// Decode an Ed25519 public key from JWK `x` field (base64url format).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64url content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================
