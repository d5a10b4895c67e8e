//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for issued tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

fn decode_part(token: &str, index: usize) -> Value {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing part {}", index));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT part {}: {:?}", index, e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT part {} JSON: {:?}", index, e))
}

/// Custom assertions for compact JWT strings
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt("EdDSA")
///     .assert_signed_by("key-1")
///     .assert_claim("sub", "alice");
/// ```
pub trait TokenAssertions {
    /// Assert three-part structure, the given algorithm, and `typ: JWT`
    fn assert_valid_jwt(&self, alg: &str) -> &Self;

    /// Assert the `kid` header
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert a payload claim equals the expected value
    fn assert_claim(&self, name: &str, expected: impl Into<Value>) -> &Self;

    /// Assert a payload claim is present
    fn assert_has_claim(&self, name: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self, alg: &str) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "JWT must have 3 parts (header.payload.signature)"
        );

        let header = decode_part(self, 0);
        assert_eq!(header["alg"], alg, "Unexpected JWT algorithm");
        assert_eq!(header["typ"], "JWT", "Expected JWT type");

        let payload = decode_part(self, 1);
        assert!(payload.is_object(), "JWT payload must be a JSON object");

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = decode_part(self, 0);
        assert_eq!(
            header["kid"], key_id,
            "Token was not signed by the expected key"
        );
        self
    }

    fn assert_claim(&self, name: &str, expected: impl Into<Value>) -> &Self {
        let payload = decode_part(self, 1);
        assert_eq!(payload[name], expected.into(), "Claim '{}' mismatch", name);
        self
    }

    fn assert_has_claim(&self, name: &str) -> &Self {
        let payload = decode_part(self, 1);
        assert!(
            payload.get(name).is_some(),
            "Token does not contain claim '{}'",
            name
        );
        self
    }
}
