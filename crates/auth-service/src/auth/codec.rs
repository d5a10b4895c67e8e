//! Token primitive: the only place `jsonwebtoken` is called.
//!
//! Three capabilities:
//! - [`decode_unverified`]: header and payload without signature checks
//! - [`verify_signature`]: signature plus time constraints for one key
//! - [`sign`]: produce a compact token with one key
//!
//! Verification failures are classified here, once, into
//! [`CodecError::SignatureMismatch`] (this key did not sign the token, try the
//! next one) and [`CodecError::Fatal`] (the token itself is unacceptable).

use super::Payload;
use crate::keystore::{KeyMaterial, Purpose};
use common::jwt::{self, DecodedToken, JwtValidationError};
use jsonwebtoken::{errors::ErrorKind, Header, Validation};
use std::time::Duration;

/// Outcome of a failed single-key verification or signing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The key did not produce this signature, or cannot serve the purpose.
    SignatureMismatch,

    /// Anything else; carries a client-safe cause.
    Fatal(String),
}

/// What a verification attempt enforces besides the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    /// Purpose fixes both the permitted algorithm and the key family.
    pub purpose: Purpose,

    /// When set, the token has no `exp` and is accepted only while
    /// `now - iat <= max_token_age`. When unset, `exp` is enforced.
    pub max_token_age: Option<Duration>,

    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,
}

impl Constraints {
    /// Constraints for a token decoded without verification.
    ///
    /// Max-age applies only when the token carries no `exp` claim.
    #[must_use]
    pub fn for_token(
        decoded: &DecodedToken,
        purpose: Purpose,
        max_token_age: Duration,
        clock_skew: Duration,
    ) -> Self {
        Self {
            purpose,
            max_token_age: (!decoded.has_exp()).then_some(max_token_age),
            clock_skew,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.purpose.algorithm());
        validation.leeway = 0;
        validation.validate_exp = self.max_token_age.is_none();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        // exp is checked when present; its absence is handled by max-age
        validation.required_spec_claims.clear();
        validation
    }
}

/// Decode a token without verifying it.
///
/// # Errors
///
/// Returns `CodecError::Fatal` for oversized or structurally invalid tokens.
pub fn decode_unverified(token: &str) -> Result<DecodedToken, CodecError> {
    jwt::decode_unverified(token).map_err(|e| CodecError::Fatal(e.to_string()))
}

/// Verify `token` with a single key and return its payload.
///
/// # Errors
///
/// - `SignatureMismatch` when the key did not sign the token, or when the
///   key material belongs to a different purpose
/// - `Fatal` for every other failure: wrong algorithm, expired, not yet
///   valid, `iat` in the future, too old, missing `iat` under max-age
pub fn verify_signature(
    token: &str,
    key: &KeyMaterial,
    constraints: &Constraints,
) -> Result<Payload, CodecError> {
    if key.purpose() != constraints.purpose {
        return Err(CodecError::SignatureMismatch);
    }

    let token_data =
        jsonwebtoken::decode::<Payload>(token, &key.decoding_key(), &constraints.validation())
            .map_err(|e| classify(e.kind()))?;
    let claims = token_data.claims;

    check_time_claims(&claims, constraints, chrono::Utc::now().timestamp())?;

    Ok(claims)
}

/// Claims checks `jsonwebtoken` does not perform.
fn check_time_claims(
    claims: &Payload,
    constraints: &Constraints,
    now: i64,
) -> Result<(), CodecError> {
    let iat = jwt::numeric_claim(claims, "iat");

    if let Some(iat) = iat {
        jwt::validate_iat_at(iat, constraints.clock_skew, now).map_err(fatal)?;
    }

    match constraints.max_token_age {
        Some(max_age) => {
            let iat = iat.ok_or(JwtValidationError::MissingIat).map_err(fatal)?;
            jwt::validate_max_age_at(iat, max_age, now).map_err(fatal)?;
        }
        // jsonwebtoken only checks exp values that fit a u64
        None => {
            if jwt::numeric_claim(claims, "exp").is_some_and(|exp| exp < now) {
                return Err(classify(&ErrorKind::ExpiredSignature));
            }
        }
    }

    Ok(())
}

fn fatal(err: JwtValidationError) -> CodecError {
    CodecError::Fatal(err.to_string())
}

fn classify(kind: &ErrorKind) -> CodecError {
    let cause = match kind {
        ErrorKind::InvalidSignature => return CodecError::SignatureMismatch,
        ErrorKind::ExpiredSignature => "token has expired",
        ErrorKind::ImmatureSignature => "token is not yet valid",
        ErrorKind::InvalidAlgorithm => "token algorithm is not permitted",
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => "malformed token",
        ErrorKind::MissingRequiredClaim(_) => "token claims are invalid",
        _ => "token validation failed",
    };
    CodecError::Fatal(cause.to_string())
}

/// Sign `payload` with `key` under `header`.
///
/// # Errors
///
/// Returns `CodecError::Fatal` if the key cannot sign (verification-only
/// Ed25519 material) or the primitive fails.
pub fn sign(payload: &Payload, key: &KeyMaterial, header: &Header) -> Result<String, CodecError> {
    let encoding_key = key
        .encoding_key()
        .ok_or_else(|| CodecError::Fatal("key has no private half".to_string()))?;

    jsonwebtoken::encode(header, payload, &encoding_key)
        .map_err(|e| CodecError::Fatal(format!("signing failed: {e}")))
}
