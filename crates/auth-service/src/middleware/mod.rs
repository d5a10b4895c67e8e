//! Middleware for the auth service.
//!
//! # Components
//!
//! - `auth` - Bearer token authentication, attaches `AuthContext`
//! - `http_metrics` - Request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{authenticate, AuthContextExt, AuthState};
pub use http_metrics::http_metrics_middleware;
