//! Observability module for the auth service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
