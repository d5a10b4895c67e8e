//! Keystore: the set of candidate signing and verification keys.
//!
//! A [`Keystore`] is an immutable snapshot mapping key identifiers to
//! [`KeyMaterial`]. The identifier [`DEFAULT_KEY_ID`] is reserved for an
//! optional fallback key. Snapshots are produced by a [`KeystoreProvider`]
//! once per verification or issuance call and are never mutated by the
//! engines that consume them.
//!
//! # Security
//!
//! - Secret bytes live in `SecretBox` and are redacted from `Debug` output
//! - Entries are stored in a `BTreeMap`, so scan order is deterministic

pub mod jwks;
pub mod provider;

pub use provider::{KeystoreProvider, StaticKeystoreProvider};

use crate::config::{Config, KeystoreSource};
use crate::errors::KeystoreError;
use base64::{engine::general_purpose::STANDARD, Engine};
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use ring::signature::{Ed25519KeyPair, KeyPair};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Reserved identifier of the fallback key.
pub const DEFAULT_KEY_ID: &str = "default";

/// Length of a raw Ed25519 public key.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Which family of keys and which algorithm a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Purpose {
    /// Symmetric secrets, HS256 only.
    Local,
    /// Ed25519 keys, EdDSA only.
    #[default]
    Public,
}

impl Purpose {
    /// The single algorithm permitted for this purpose.
    #[must_use]
    pub fn algorithm(self) -> Algorithm {
        match self {
            Purpose::Local => Algorithm::HS256,
            Purpose::Public => Algorithm::EdDSA,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Local => "local",
            Purpose::Public => "public",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = KeystoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" => Ok(Purpose::Local),
            "public" => Ok(Purpose::Public),
            other => Err(KeystoreError::UnknownPurpose(other.to_string())),
        }
    }
}

/// Key data for a single keystore entry.
pub enum KeyMaterial {
    /// Shared secret for HS256.
    Symmetric(SecretBox<Vec<u8>>),

    /// Ed25519 key. Verification needs only `public_key`; signing needs the
    /// PKCS#8 private key.
    Ed25519 {
        public_key: Vec<u8>,
        private_key: Option<SecretBox<Vec<u8>>>,
    },
}

impl KeyMaterial {
    /// Symmetric secret material.
    ///
    /// # Errors
    ///
    /// `InvalidKeyMaterial` if the secret is empty.
    pub fn symmetric(secret: Vec<u8>) -> Result<Self, KeystoreError> {
        if secret.is_empty() {
            return Err(KeystoreError::InvalidKeyMaterial(
                "symmetric secret must not be empty".to_string(),
            ));
        }
        Ok(KeyMaterial::Symmetric(SecretBox::new(Box::new(secret))))
    }

    /// Verification-only Ed25519 material from a raw 32-byte public key.
    ///
    /// # Errors
    ///
    /// `InvalidKeyMaterial` if the key is not 32 bytes.
    pub fn ed25519_public(public_key: Vec<u8>) -> Result<Self, KeystoreError> {
        if public_key.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(KeystoreError::InvalidKeyMaterial(format!(
                "Ed25519 public key must be {ED25519_PUBLIC_KEY_LEN} bytes, got {}",
                public_key.len()
            )));
        }
        Ok(KeyMaterial::Ed25519 {
            public_key,
            private_key: None,
        })
    }

    /// Signing-capable Ed25519 material from a PKCS#8 private key.
    ///
    /// The public half is derived from the document.
    ///
    /// # Errors
    ///
    /// `InvalidKeyMaterial` if the document is not a valid Ed25519 PKCS#8 key.
    pub fn ed25519_pkcs8(private_key_pkcs8: Vec<u8>) -> Result<Self, KeystoreError> {
        let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(&private_key_pkcs8)
            .map_err(|e| {
                KeystoreError::InvalidKeyMaterial(format!("invalid Ed25519 PKCS#8 key: {e}"))
            })?;
        let public_key = key_pair.public_key().as_ref().to_vec();

        Ok(KeyMaterial::Ed25519 {
            public_key,
            private_key: Some(SecretBox::new(Box::new(private_key_pkcs8))),
        })
    }

    /// Parse standard base64 key data for the given purpose.
    ///
    /// `local` takes the secret bytes. `public` takes either a raw 32-byte
    /// public key or a PKCS#8 private key.
    ///
    /// # Errors
    ///
    /// `InvalidKeyMaterial` on bad base64 or key data.
    pub fn from_base64(purpose: Purpose, encoded: &str) -> Result<Self, KeystoreError> {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
            KeystoreError::InvalidKeyMaterial(format!("key is not valid base64: {e}"))
        })?;

        match purpose {
            Purpose::Local => Self::symmetric(bytes),
            Purpose::Public if bytes.len() == ED25519_PUBLIC_KEY_LEN => {
                Self::ed25519_public(bytes)
            }
            Purpose::Public => Self::ed25519_pkcs8(bytes),
        }
    }

    /// The purpose this material can serve.
    #[must_use]
    pub fn purpose(&self) -> Purpose {
        match self {
            KeyMaterial::Symmetric(_) => Purpose::Local,
            KeyMaterial::Ed25519 { .. } => Purpose::Public,
        }
    }

    /// Whether this material can sign.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        match self {
            KeyMaterial::Symmetric(_) => true,
            KeyMaterial::Ed25519 { private_key, .. } => private_key.is_some(),
        }
    }

    /// Verification key for `jsonwebtoken`.
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        match self {
            KeyMaterial::Symmetric(secret) => DecodingKey::from_secret(secret.expose_secret()),
            KeyMaterial::Ed25519 { public_key, .. } => DecodingKey::from_ed_der(public_key),
        }
    }

    /// Signing key for `jsonwebtoken`, or `None` for verification-only material.
    #[must_use]
    pub fn encoding_key(&self) -> Option<EncodingKey> {
        match self {
            KeyMaterial::Symmetric(secret) => {
                Some(EncodingKey::from_secret(secret.expose_secret()))
            }
            KeyMaterial::Ed25519 { private_key, .. } => private_key
                .as_ref()
                .map(|pkcs8| EncodingKey::from_ed_der(pkcs8.expose_secret())),
        }
    }
}

// SecretBox<Vec<u8>> is not Clone, so clone through the exposed bytes.
impl Clone for KeyMaterial {
    fn clone(&self) -> Self {
        match self {
            KeyMaterial::Symmetric(secret) => {
                KeyMaterial::Symmetric(SecretBox::new(Box::new(secret.expose_secret().clone())))
            }
            KeyMaterial::Ed25519 {
                public_key,
                private_key,
            } => KeyMaterial::Ed25519 {
                public_key: public_key.clone(),
                private_key: private_key
                    .as_ref()
                    .map(|pkcs8| SecretBox::new(Box::new(pkcs8.expose_secret().clone()))),
            },
        }
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyMaterial::Symmetric(a), KeyMaterial::Symmetric(b)) => {
                a.expose_secret() == b.expose_secret()
            }
            (
                KeyMaterial::Ed25519 {
                    public_key: pub_a,
                    private_key: priv_a,
                },
                KeyMaterial::Ed25519 {
                    public_key: pub_b,
                    private_key: priv_b,
                },
            ) => {
                pub_a == pub_b
                    && match (priv_a, priv_b) {
                        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => false,
        }
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Symmetric(_) => f
                .debug_tuple("Symmetric")
                .field(&"[REDACTED]")
                .finish(),
            KeyMaterial::Ed25519 {
                public_key,
                private_key,
            } => f
                .debug_struct("Ed25519")
                .field("public_key_len", &public_key.len())
                .field("private_key", &private_key.as_ref().map(|_| "[REDACTED]"))
                .finish(),
        }
    }
}

/// Immutable mapping from key identifier to key material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keystore {
    entries: BTreeMap<String, KeyMaterial>,
}

impl Keystore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    ///
    /// # Errors
    ///
    /// `EmptyKeyId` for an empty identifier, `DuplicateKeyId` if the
    /// identifier is already present.
    pub fn insert(
        &mut self,
        key_id: impl Into<String>,
        material: KeyMaterial,
    ) -> Result<(), KeystoreError> {
        let key_id = key_id.into();
        if key_id.is_empty() {
            return Err(KeystoreError::EmptyKeyId);
        }
        if self.entries.contains_key(&key_id) {
            return Err(KeystoreError::DuplicateKeyId(key_id));
        }
        self.entries.insert(key_id, material);
        Ok(())
    }

    /// Builder form of [`Keystore::insert`].
    ///
    /// # Errors
    ///
    /// See [`Keystore::insert`].
    pub fn with_key(
        mut self,
        key_id: impl Into<String>,
        material: KeyMaterial,
    ) -> Result<Self, KeystoreError> {
        self.insert(key_id, material)?;
        Ok(self)
    }

    /// Parse `id=base64,id=base64` into a keystore for `purpose`.
    ///
    /// Blank segments are ignored. Ids must not contain `=`.
    ///
    /// # Errors
    ///
    /// `InvalidKeyMaterial` for an entry without `=` or with bad key data,
    /// plus anything [`Keystore::insert`] rejects.
    pub fn parse_key_list(purpose: Purpose, keys: &str) -> Result<Self, KeystoreError> {
        let mut keystore = Self::new();

        for entry in keys.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((key_id, encoded)) = entry.split_once('=') else {
                return Err(KeystoreError::InvalidKeyMaterial(
                    "key entries must have the form id=base64".to_string(),
                ));
            };
            let material = KeyMaterial::from_base64(purpose, encoded)?;
            keystore.insert(key_id.trim(), material)?;
        }

        Ok(keystore)
    }

    #[must_use]
    pub fn get(&self, key_id: &str) -> Option<&KeyMaterial> {
        self.entries.get(key_id)
    }

    /// Entry lookup that also returns the stored identifier.
    #[must_use]
    pub fn get_key_value(&self, key_id: &str) -> Option<(&str, &KeyMaterial)> {
        self.entries
            .get_key_value(key_id)
            .map(|(id, material)| (id.as_str(), material))
    }

    /// The `"default"` entry, if any.
    #[must_use]
    pub fn default_key(&self) -> Option<&KeyMaterial> {
        self.get(DEFAULT_KEY_ID)
    }

    #[must_use]
    pub fn contains(&self, key_id: &str) -> bool {
        self.entries.contains_key(key_id)
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyMaterial)> {
        self.entries
            .iter()
            .map(|(id, material)| (id.as_str(), material))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reverse lookup: first identifier (in keystore order) whose material
    /// equals `material`.
    #[must_use]
    pub fn key_id_of(&self, material: &KeyMaterial) -> Option<&str> {
        self.iter()
            .find(|(_, candidate)| *candidate == material)
            .map(|(id, _)| id)
    }
}

/// Build the provider named by the configuration.
///
/// # Errors
///
/// Returns `KeystoreError` if static keys cannot be parsed.
pub fn build_provider(config: &Config) -> Result<Arc<dyn KeystoreProvider>, KeystoreError> {
    match &config.keystore_source {
        KeystoreSource::Static(keys) => {
            let keystore = Keystore::parse_key_list(config.purpose, keys.expose_secret())?;
            tracing::info!(
                target: "auth.keystore",
                purpose = %config.purpose,
                key_count = keystore.len(),
                "Loaded static keystore"
            );
            Ok(Arc::new(StaticKeystoreProvider::new(keystore)))
        }
        KeystoreSource::Jwks { url, cache_ttl } => {
            tracing::info!(
                target: "auth.keystore",
                url = %url,
                cache_ttl_secs = cache_ttl.as_secs(),
                "Using JWKS keystore"
            );
            Ok(Arc::new(jwks::JwksKeystoreProvider::with_ttl(
                url.clone(),
                *cache_ttl,
            )))
        }
    }
}
