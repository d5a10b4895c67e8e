//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs and HS256 secrets.
//! All fixtures are deterministic based on seed values.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::json;
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Deterministic Ed25519 keypair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEd25519Key {
    /// Raw 32-byte public key.
    pub public_key: Vec<u8>,

    /// PKCS#8 v1 DER private key document.
    pub private_key_pkcs8: Vec<u8>,
}

impl TestEd25519Key {
    /// Public key as standard base64 (the `AUTH_KEYS` format).
    pub fn public_key_b64(&self) -> String {
        STANDARD.encode(&self.public_key)
    }

    /// PKCS#8 private key as standard base64 (the `AUTH_KEYS` format).
    pub fn private_key_b64(&self) -> String {
        STANDARD.encode(&self.private_key_pkcs8)
    }

    /// Public key in PEM format.
    pub fn public_key_pem(&self) -> String {
        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
            self.public_key_b64()
        )
    }

    /// The key as an `OKP`/`Ed25519` JWK, as served by a JWKS endpoint.
    pub fn to_jwk(&self, kid: &str) -> serde_json::Value {
        json!({
            "kty": "OKP",
            "kid": kid,
            "crv": "Ed25519",
            "x": URL_SAFE_NO_PAD.encode(&self.public_key),
            "alg": "EdDSA",
            "use": "sig",
        })
    }
}

/// Generate a deterministic Ed25519 signing key for testing.
///
/// The same seed always produces the same keypair, ensuring test reproducibility.
///
/// # Example
/// ```rust,ignore
/// let key = test_ed25519_key(1)?;
/// // Same seed always produces same key
/// assert_eq!(key, test_ed25519_key(1)?);
/// ```
pub fn test_ed25519_key(seed: u8) -> Result<TestEd25519Key, FixtureError> {
    let seed_bytes = seed_bytes(seed);

    // Note: from_seed_unchecked is deterministic and suitable for testing
    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    Ok(TestEd25519Key {
        public_key: key_pair.public_key().as_ref().to_vec(),
        private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
    })
}

/// Deterministic 32-byte HS256 secret for testing.
///
/// Different seeds produce different secrets.
pub fn test_hmac_secret(seed: u8) -> Vec<u8> {
    seed_bytes(seed).iter().map(|b| b ^ 0x5c).collect()
}

/// Create a deterministic 32-byte seed from the input.
fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = seed;
    // Fill rest with deterministic pattern
    for (i, byte) in bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// Ring doesn't expose a method to get PKCS#8 from `Ed25519KeyPair`, so we build it.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // PKCS#8 v1 format for Ed25519 (RFC 5208):
    // SEQUENCE {
    //   version         INTEGER (0),
    //   algorithm       AlgorithmIdentifier,
    //   privateKey      OCTET STRING
    // }
    // Where privateKey is an OCTET STRING wrapping the 32-byte seed
    let mut pkcs8 = Vec::with_capacity(48);

    // Outer SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);

    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);

    // AlgorithmIdentifier: SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);

    // privateKey: OCTET STRING (34) { OCTET STRING (32) seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
