//! Builder patterns for test token construction
//!
//! Tokens are signed directly with `jsonwebtoken`, independent of the
//! service's issuance path, so verification tests do not depend on it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};

use crate::crypto_fixtures::FixtureError;

/// Builder for creating signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_claim("scope", "read")
///     .expires_in(3600)
///     .with_kid("key-1")
///     .sign_hs256(&test_hmac_secret(1))?;
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    kid: Option<String>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults (`sub`, `iat` now, `exp` in one hour)
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from("test-subject"));
        claims.insert("iat".to_string(), Value::from(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            Value::from((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims, kid: None }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", subject)
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", exp)
    }

    /// Token that expired a minute ago
    pub fn expired(self) -> Self {
        self.expires_in(-60)
    }

    /// Drop the `exp` claim
    pub fn without_exp(self) -> Self {
        self.without_claim("exp")
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", timestamp)
    }

    /// Set issued-at relative to now (negative for the past)
    pub fn issued_seconds_from_now(self, seconds: i64) -> Self {
        let iat = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.issued_at(iat)
    }

    /// Drop the `iat` claim
    pub fn without_iat(self) -> Self {
        self.without_claim("iat")
    }

    /// Set the `kid` header
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Build the claims as a JSON object
    pub fn build(&self) -> Map<String, Value> {
        self.claims.clone()
    }

    /// Sign with HS256 and the given secret
    pub fn sign_hs256(&self, secret: &[u8]) -> Result<String, FixtureError> {
        self.sign_with(Algorithm::HS256, &EncodingKey::from_secret(secret))
    }

    /// Sign with EdDSA and the given PKCS#8 private key
    pub fn sign_eddsa(&self, private_key_pkcs8: &[u8]) -> Result<String, FixtureError> {
        self.sign_with(Algorithm::EdDSA, &EncodingKey::from_ed_der(private_key_pkcs8))
    }

    fn sign_with(&self, algorithm: Algorithm, key: &EncodingKey) -> Result<String, FixtureError> {
        let mut header = Header::new(algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = self.kid.clone();

        encode(&header, &self.claims, key).map_err(|e| FixtureError::Signing(e.to_string()))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a token from raw header and payload JSON with a junk signature.
///
/// For tests that need headers `jsonwebtoken` would refuse to produce.
pub fn unsigned_token(header: &Value, payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(payload.to_string()),
        URL_SAFE_NO_PAD.encode(b"not-a-signature"),
    )
}
