//! Metrics definitions for the auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max
//! - `endpoint`: known paths, everything else collapses to `/other`
//! - `status`: success, error, timeout
//! - `strategy`: key_id, default, scan
//! - `error`: bounded by `AuthError` codes
//!
//! Key identifiers are never used as label values.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("auth_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Verification is local CPU work; a scan over many keys is the slow path
        .set_buckets_for_metric(
            Matcher::Prefix("auth_token_verification".to_string()),
            &[
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025, 0.050,
            ],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("auth_token_issuance".to_string()),
            &[0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.010],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `auth_http_requests_total`, `auth_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("auth_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("auth_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path for metrics labels
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/me" => "/api/v1/me",
        _ => "/other",
    }
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token verification outcome
///
/// Metric: `auth_token_verifications_total`, `auth_token_verification_duration_seconds`
/// Labels: `status` plus `strategy` on success or `error` on failure
pub fn record_token_verification(status: &str, outcome: &str, duration: Duration) {
    let outcome_label = if status == "success" {
        "strategy"
    } else {
        "error"
    };

    histogram!("auth_token_verification_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("auth_token_verifications_total",
        "status" => status.to_string(),
        outcome_label => outcome.to_string()
    )
    .increment(1);
}

/// Record a token issuance outcome
///
/// Metric: `auth_token_issuance_total`, `auth_token_issuance_duration_seconds`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("auth_token_issuance_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("auth_token_issuance_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Keystore Metrics
// ============================================================================

/// Record a keystore fetch from a remote source
///
/// Metric: `auth_keystore_fetch_total`
/// Labels: `source`, `status`
pub fn record_keystore_fetch(source: &str, status: &str) {
    counter!("auth_keystore_fetch_total",
        "source" => source.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
