//! Common utilities and types shared across Keygate crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (unverified decoding, claim checks, constants)
pub mod jwt;
