//! Token verification engine.
//!
//! Given a token and a keystore snapshot, tries candidate keys in three
//! explicit tiers until one verifies:
//!
//! 1. [`KeyStrategy::KeyId`]: the key named by the header `kid`
//! 2. [`KeyStrategy::Default`]: the `"default"` key
//! 3. [`KeyStrategy::Scan`]: every other key, in keystore order
//!
//! Each key is tried at most once. A signature mismatch moves on to the next
//! candidate; any other failure stops the sequence. Failures never name the
//! keys that were tried.

use super::codec::{self, CodecError, Constraints};
use super::Payload;
use crate::errors::AuthError;
use crate::keystore::{KeyMaterial, Keystore, Purpose, DEFAULT_KEY_ID};
use crate::observability::metrics;
use common::jwt::{DEFAULT_CLOCK_SKEW, DEFAULT_MAX_TOKEN_AGE};
use std::time::{Duration, Instant};
use tracing::instrument;

/// How the matching key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    KeyId,
    Default,
    Scan,
}

impl KeyStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStrategy::KeyId => "key_id",
            KeyStrategy::Default => "default",
            KeyStrategy::Scan => "scan",
        }
    }
}

/// Verifier configuration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    pub purpose: Purpose,

    /// Maximum age of tokens that carry no `exp` claim.
    pub max_token_age: Duration,

    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            purpose: Purpose::default(),
            max_token_age: DEFAULT_MAX_TOKEN_AGE,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

/// A successfully verified token.
#[derive(Clone, PartialEq)]
pub struct VerifiedToken {
    pub payload: Payload,

    /// Identifier of the key that verified the signature.
    pub key_id: String,

    pub strategy: KeyStrategy,
}

// Payload may carry personal data
impl std::fmt::Debug for VerifiedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedToken")
            .field("payload", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// One entry of the candidate list.
struct Candidate<'k> {
    strategy: KeyStrategy,
    key_id: &'k str,
    material: &'k KeyMaterial,
}

/// Stateless token verifier.
#[derive(Debug, Clone, Default)]
pub struct TokenVerifier {
    config: VerifierConfig,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify `token` against `keystore`.
    ///
    /// # Errors
    ///
    /// - `AuthError::VerificationError` if the token is malformed, declares a
    ///   different algorithm than the configured purpose allows, or fails a
    ///   claim check under the key that signed it
    /// - `AuthError::NoMatchingKey` if no key in the keystore verifies it
    #[instrument(skip_all, name = "auth.verifier.verify")]
    pub fn verify(&self, token: &str, keystore: &Keystore) -> Result<VerifiedToken, AuthError> {
        let start = Instant::now();
        let result = self.verify_inner(token, keystore);
        let duration = start.elapsed();

        match &result {
            Ok(verified) => {
                tracing::debug!(
                    target: "auth.verifier",
                    strategy = verified.strategy.as_str(),
                    key_id = %verified.key_id,
                    "Token verified"
                );
                metrics::record_token_verification(
                    "success",
                    verified.strategy.as_str(),
                    duration,
                );
            }
            Err(e) => {
                tracing::debug!(target: "auth.verifier", error = %e, "Token verification failed");
                metrics::record_token_verification("error", e.code(), duration);
            }
        }

        result
    }

    fn verify_inner(&self, token: &str, keystore: &Keystore) -> Result<VerifiedToken, AuthError> {
        let decoded = codec::decode_unverified(token).map_err(into_auth_error)?;

        let algorithm = self.config.purpose.algorithm();
        if decoded.header.alg != algorithm {
            tracing::debug!(
                target: "auth.verifier",
                declared = ?decoded.header.alg,
                permitted = ?algorithm,
                "Token rejected: algorithm not permitted"
            );
            return Err(AuthError::VerificationError(
                "token algorithm is not permitted".to_string(),
            ));
        }

        decoded
            .check_time_claim_types()
            .map_err(|e| AuthError::VerificationError(e.to_string()))?;

        let constraints = Constraints::for_token(
            &decoded,
            self.config.purpose,
            self.config.max_token_age,
            self.config.clock_skew,
        );

        for candidate in candidates(decoded.kid(), keystore) {
            match codec::verify_signature(token, candidate.material, &constraints) {
                Ok(payload) => {
                    return Ok(VerifiedToken {
                        payload,
                        key_id: candidate.key_id.to_string(),
                        strategy: candidate.strategy,
                    });
                }
                Err(CodecError::SignatureMismatch) => {
                    tracing::trace!(
                        target: "auth.verifier",
                        strategy = candidate.strategy.as_str(),
                        "Candidate key did not match"
                    );
                }
                Err(CodecError::Fatal(cause)) => {
                    return Err(AuthError::VerificationError(cause));
                }
            }
        }

        Err(AuthError::NoMatchingKey)
    }
}

fn into_auth_error(err: CodecError) -> AuthError {
    match err {
        CodecError::SignatureMismatch => AuthError::NoMatchingKey,
        CodecError::Fatal(cause) => AuthError::VerificationError(cause),
    }
}

/// Build the ordered candidate list: kid, then default, then scan.
fn candidates<'k>(kid: Option<&str>, keystore: &'k Keystore) -> Vec<Candidate<'k>> {
    let mut list = Vec::with_capacity(keystore.len());

    let by_kid = kid.and_then(|kid| keystore.get_key_value(kid));
    if let Some((key_id, material)) = by_kid {
        list.push(Candidate {
            strategy: KeyStrategy::KeyId,
            key_id,
            material,
        });
    }
    let tried = by_kid.map(|(key_id, _)| key_id);

    if tried != Some(DEFAULT_KEY_ID) {
        if let Some((key_id, material)) = keystore.get_key_value(DEFAULT_KEY_ID) {
            list.push(Candidate {
                strategy: KeyStrategy::Default,
                key_id,
                material,
            });
        }
    }

    list.extend(
        keystore
            .iter()
            .filter(|(key_id, _)| *key_id != DEFAULT_KEY_ID && Some(*key_id) != tried)
            .map(|(key_id, material)| Candidate {
                strategy: KeyStrategy::Scan,
                key_id,
                material,
            }),
    );

    list
}
