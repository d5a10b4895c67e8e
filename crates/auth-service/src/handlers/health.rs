//! Liveness and readiness probes.

use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Readiness probe body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Number of keys in the current snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<usize>,
}

/// Handler for GET /health
///
/// Liveness only; never touches the keystore.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Handler for GET /ready
///
/// Ready when the keystore provider yields a non-empty snapshot.
#[instrument(skip_all, name = "auth.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match state.keystore_provider.keystore().await {
        Ok(keystore) if !keystore.is_empty() => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                keys: Some(keystore.len()),
            }),
        ),
        Ok(_) => {
            tracing::warn!(target: "auth.health", "Keystore is empty");
            not_ready()
        }
        Err(e) => {
            tracing::warn!(target: "auth.health", error = %e, "Keystore unavailable");
            not_ready()
        }
    }
}

fn not_ready() -> (StatusCode, Json<ReadinessResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ReadinessResponse {
            status: "not_ready",
            keys: None,
        }),
    )
}
