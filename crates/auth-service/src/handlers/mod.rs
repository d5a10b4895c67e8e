//! HTTP request handlers.

mod health;
mod me;
mod metrics;

pub use health::{health_check, readiness_check, ReadinessResponse};
pub use me::{get_me, MeResponse};
pub use metrics::metrics_handler;
