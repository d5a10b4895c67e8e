//! # Auth Test Utilities
//!
//! Shared test utilities for the Keygate auth service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (Ed25519 keys from fixed seeds, HS256 secrets)
//! - A token builder that signs test tokens directly with `jsonwebtoken`
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! let key = test_ed25519_key(1)?;
//! let token = TestTokenBuilder::new()
//!     .for_user("alice")
//!     .with_kid("key-1")
//!     .sign_eddsa(&key.private_key_pkcs8)?;
//!
//! token.assert_valid_jwt("EdDSA").assert_signed_by("key-1");
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use token_builders::*;
