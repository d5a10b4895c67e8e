//! Per-request authentication context.
//!
//! Inserted into request extensions by the auth middleware when a token
//! verifies. Handlers read it with `Extension<AuthContext>` (required) or
//! `Option<Extension<AuthContext>>` (anonymous allowed).

use super::{Payload, VerifiedToken};
use serde::de::DeserializeOwned;
use std::fmt;

/// Verified payload plus the id of the key that verified it.
#[derive(Clone, PartialEq)]
pub struct AuthContext {
    pub payload: Payload,
    pub key_id: String,
}

impl AuthContext {
    /// Deserialize the payload into an application claims type.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload does not match `T`.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.payload.clone()))
    }

    /// The `sub` claim, if it is a string.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(serde_json::Value::as_str)
    }
}

impl From<VerifiedToken> for AuthContext {
    fn from(verified: VerifiedToken) -> Self {
        Self {
            payload: verified.payload,
            key_id: verified.key_id,
        }
    }
}

/// Redacts the payload, which may carry user identifiers.
impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("payload", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .finish()
    }
}
