//! Keygate auth service library.
//!
//! Bearer token verification against a keystore of candidate keys, token
//! issuance from the same keystore, and the axum middleware that ties them
//! to HTTP requests.
//!
//! This library is used by both the main binary and integration tests.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod keystore;
pub mod middleware;
pub mod observability;
pub mod routes;
