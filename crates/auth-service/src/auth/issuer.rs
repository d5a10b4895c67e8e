//! Token issuance engine.
//!
//! Key selection, in order:
//! 1. the requested key id, if present in the keystore
//! 2. the `"default"` key
//! 3. the first key in keystore order
//!
//! The header `kid` is found by reverse lookup of the selected material, so
//! two ids sharing one key always advertise the same (first) id.

use super::codec;
use super::Payload;
use crate::errors::AuthError;
use crate::keystore::{KeyMaterial, Keystore, Purpose};
use crate::observability::metrics;
use common::jwt;
use jsonwebtoken::Header;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Per-call issuance options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueOptions {
    /// Preferred signing key.
    pub key_id: Option<String>,

    /// Lifetime stamped as `exp` when the payload has none.
    pub expires_in: Option<Duration>,
}

/// Stateless token issuer.
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer {
    purpose: Purpose,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(purpose: Purpose) -> Self {
        Self { purpose }
    }

    /// Sign `payload` with a key from `keystore`.
    ///
    /// `iat` is stamped when absent, and `exp` when `expires_in` is given and
    /// the payload has none. Caller-supplied claims are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SigningError` if the keystore is empty, the
    /// selected key belongs to another purpose or has no private half, or the
    /// signing primitive fails.
    #[instrument(skip_all, name = "auth.issuer.issue")]
    pub fn issue(
        &self,
        payload: Payload,
        keystore: &Keystore,
        options: &IssueOptions,
    ) -> Result<String, AuthError> {
        let start = Instant::now();
        let result = self.issue_inner(payload, keystore, options);

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_token_issuance(status, start.elapsed());
        if let Err(e) = &result {
            tracing::warn!(target: "auth.issuer", error = %e, "Token issuance failed");
        }

        result
    }

    fn issue_inner(
        &self,
        mut payload: Payload,
        keystore: &Keystore,
        options: &IssueOptions,
    ) -> Result<String, AuthError> {
        let material = select_key(keystore, options.key_id.as_deref())
            .ok_or_else(|| AuthError::SigningError("keystore is empty".to_string()))?;

        if material.purpose() != self.purpose {
            return Err(AuthError::SigningError(format!(
                "selected key cannot be used for purpose {}",
                self.purpose
            )));
        }
        if !material.can_sign() {
            return Err(AuthError::SigningError(
                "selected key has no private half".to_string(),
            ));
        }

        // The selected material is in the keystore, so the lookup finds it.
        let kid = keystore
            .key_id_of(material)
            .ok_or_else(|| AuthError::SigningError("selected key not in keystore".to_string()))?;

        stamp_time_claims(&mut payload, chrono::Utc::now().timestamp(), options.expires_in)?;

        let mut header = Header::new(self.purpose.algorithm());
        header.typ = Some("JWT".to_string());
        header.kid = Some(kid.to_string());

        let token = codec::sign(&payload, material, &header).map_err(|e| match e {
            codec::CodecError::Fatal(cause) => AuthError::SigningError(cause),
            codec::CodecError::SignatureMismatch => {
                AuthError::SigningError("key cannot sign".to_string())
            }
        })?;

        tracing::debug!(target: "auth.issuer", kid = %kid, "Token issued");
        Ok(token)
    }
}

fn select_key<'k>(keystore: &'k Keystore, requested: Option<&str>) -> Option<&'k KeyMaterial> {
    if let Some(requested) = requested {
        if let Some(material) = keystore.get(requested) {
            return Some(material);
        }
        tracing::debug!(
            target: "auth.issuer",
            requested = %requested,
            "Requested key not in keystore, falling back"
        );
    }

    keystore
        .default_key()
        .or_else(|| keystore.iter().next().map(|(_, material)| material))
}

/// Caller-supplied time claims must be numbers; the verifier rejects
/// anything else.
fn stamp_time_claims(
    payload: &mut Payload,
    now: i64,
    expires_in: Option<Duration>,
) -> Result<(), AuthError> {
    for name in ["exp", "nbf", "iat"] {
        if payload.contains_key(name) && jwt::numeric_claim(payload, name).is_none() {
            return Err(AuthError::SigningError(format!(
                "{name} claim must be a number"
            )));
        }
    }

    let iat = match jwt::numeric_claim(payload, "iat") {
        Some(iat) => iat,
        None => {
            payload.insert("iat".to_string(), Value::from(now));
            now
        }
    };

    if let Some(expires_in) = expires_in {
        let lifetime = i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX);
        payload
            .entry("exp")
            .or_insert_with(|| Value::from(iat.saturating_add(lifetime)));
    }
    Ok(())
}
