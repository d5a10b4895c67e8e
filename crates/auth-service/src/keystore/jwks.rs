//! JWKS keystore provider.
//!
//! Fetches a JSON Web Key Set over HTTP and turns it into a `public`
//! keystore, cached for a configurable TTL.
//!
//! # Security
//!
//! - Only `OKP`/`Ed25519` keys are accepted; other key types are skipped
//! - Cache is invalidated on TTL expiry to pick up key rotations
//! - HTTPS should be used in production (enforced by deployment config)

use super::{KeyMaterial, Keystore, KeystoreProvider};
use crate::errors::KeystoreError;
use crate::observability::metrics;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// JSON Web Key from a JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP" for Ed25519).
    pub kty: String,

    /// Key ID, becomes the keystore identifier.
    pub kid: String,

    /// Curve name ("Ed25519" for EdDSA).
    #[serde(default)]
    pub crv: Option<String>,

    /// Public key value (base64url encoded).
    #[serde(default)]
    pub x: Option<String>,

    /// Algorithm (should be "EdDSA" when present).
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" when present).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

impl Jwk {
    /// Convert to key material, or explain why the key is unusable.
    fn to_material(&self) -> Result<KeyMaterial, String> {
        if self.kty != "OKP" {
            return Err(format!("unsupported key type {}", self.kty));
        }
        if self.crv.as_deref() != Some("Ed25519") {
            return Err("unsupported curve".to_string());
        }
        if self.alg.as_deref().is_some_and(|alg| alg != "EdDSA") {
            return Err("unsupported algorithm".to_string());
        }
        if self.key_use.as_deref().is_some_and(|key_use| key_use != "sig") {
            return Err("key is not a signing key".to_string());
        }

        let x = self.x.as_deref().ok_or("missing x parameter")?;
        let public_key = common::jwt::decode_ed25519_public_key_jwk(x)
            .map_err(|e| format!("invalid x parameter: {e}"))?;
        KeyMaterial::ed25519_public(public_key).map_err(|e| e.to_string())
    }
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Cached keystore with expiry time.
struct CachedKeystore {
    keystore: Arc<Keystore>,
    expires_at: Instant,
}

/// Keystore provider backed by a JWKS endpoint.
///
/// Concurrent callers share the cached snapshot; each receives its own
/// `Arc` handle.
pub struct JwksKeystoreProvider {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached keystore.
    cache: Arc<RwLock<Option<CachedKeystore>>>,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl JwksKeystoreProvider {
    /// Create a provider with the default cache TTL.
    #[must_use]
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a provider with a custom cache TTL.
    #[must_use]
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "auth.keystore.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    /// Fetch the JWKS and replace the cached snapshot.
    ///
    /// # Errors
    ///
    /// `KeystoreError::Unavailable` if the endpoint cannot be reached, returns
    /// a non-success status, or serves something that is not a JWKS.
    #[instrument(skip(self), name = "auth.keystore.jwks.refresh")]
    pub async fn refresh(&self) -> Result<Arc<Keystore>, KeystoreError> {
        let result = self.fetch().await;
        metrics::record_keystore_fetch(
            "jwks",
            if result.is_ok() { "success" } else { "error" },
        );

        let keystore = Arc::new(result?);
        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeystore {
            keystore: Arc::clone(&keystore),
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(keystore)
    }

    async fn fetch(&self) -> Result<Keystore, KeystoreError> {
        tracing::debug!(target: "auth.keystore.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "auth.keystore.jwks", error = %e, "Failed to fetch JWKS");
                KeystoreError::Unavailable("JWKS endpoint unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "auth.keystore.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeystoreError::Unavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "auth.keystore.jwks", error = %e, "Failed to parse JWKS response");
            KeystoreError::Unavailable("JWKS response is not a key set".to_string())
        })?;

        let keystore = keystore_from_jwks(jwks);

        tracing::info!(
            target: "auth.keystore.jwks",
            key_count = keystore.len(),
            "JWKS cache refreshed"
        );

        Ok(keystore)
    }

    /// Clear the cache.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

#[async_trait::async_trait]
impl KeystoreProvider for JwksKeystoreProvider {
    async fn keystore(&self) -> Result<Arc<Keystore>, KeystoreError> {
        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    tracing::trace!(target: "auth.keystore.jwks", "JWKS cache hit");
                    return Ok(Arc::clone(&cached.keystore));
                }
            }
        }

        // Cache miss or expired - fetch fresh JWKS
        self.refresh().await
    }
}

/// Build a keystore from a key set, skipping unusable and repeated keys.
fn keystore_from_jwks(jwks: JwksResponse) -> Keystore {
    let mut keystore = Keystore::new();

    for jwk in jwks.keys {
        let material = match jwk.to_material() {
            Ok(material) => material,
            Err(reason) => {
                tracing::warn!(target: "auth.keystore.jwks", kid = %jwk.kid, reason = %reason, "Skipping JWK");
                continue;
            }
        };
        if let Err(e) = keystore.insert(jwk.kid.clone(), material) {
            tracing::warn!(target: "auth.keystore.jwks", kid = %jwk.kid, error = %e, "Skipping JWK");
        }
    }

    keystore
}
