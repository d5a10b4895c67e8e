//! Token verification and issuance.
//!
//! - [`codec`]: the `jsonwebtoken` primitive and failure classification
//! - [`verifier`]: three-tier key selection for inbound tokens
//! - [`issuer`]: signing key selection for new tokens
//! - [`context`]: what a verified request carries downstream

pub mod codec;
pub mod context;
pub mod issuer;
pub mod verifier;

pub use context::AuthContext;
pub use issuer::{IssueOptions, TokenIssuer};
pub use verifier::{KeyStrategy, TokenVerifier, VerifiedToken, VerifierConfig};

/// Token payload: a JSON object of claims.
pub type Payload = serde_json::Map<String, serde_json::Value>;
