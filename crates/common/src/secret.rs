//! Secret wrappers for key material and bearer tokens.
//!
//! `Debug` on these types prints `[REDACTED]`, and the contents are zeroized
//! on drop. Reading the value requires an explicit `expose_secret()`.
//!
//! - `SecretString`: the `AUTH_KEYS` configuration value
//! - `SecretBox<Vec<u8>>`: HMAC secrets and Ed25519 PKCS#8 documents held in
//!   a keystore

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
