//! Integration tests for health probes
//!
//! Liveness never touches the keystore; readiness requires a non-empty
//! snapshot from the provider.

use crate::server_harness::{test_config, TestGatewayServer};
use auth_service::keystore::provider::mock::MockKeystoreProvider;
use auth_service::keystore::{KeyMaterial, Keystore, KeystoreProvider, Purpose};
use auth_test_utils::test_hmac_secret;
use reqwest::StatusCode;
use std::sync::Arc;

fn one_key_keystore() -> Result<Keystore, anyhow::Error> {
    Ok(Keystore::new().with_key("default", KeyMaterial::symmetric(test_hmac_secret(1))?)?)
}

// ============================================================================
// Liveness Probe Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(one_key_keystore()?, false).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_health_ignores_keystore_failure() -> Result<(), anyhow::Error> {
    let provider = Arc::new(MockKeystoreProvider::failing());
    let server = TestGatewayServer::spawn_with_provider(
        Arc::clone(&provider) as Arc<dyn KeystoreProvider>,
        test_config(Purpose::Local, true),
    )
    .await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.call_count(), 0, "liveness must not fetch keys");

    Ok(())
}

// ============================================================================
// Readiness Probe Tests
// ============================================================================

#[tokio::test]
async fn test_ready_reports_key_count() -> Result<(), anyhow::Error> {
    let keystore = one_key_keystore()?
        .with_key("k2", KeyMaterial::symmetric(test_hmac_secret(2))?)?;
    let server = TestGatewayServer::spawn(keystore, false).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({"status": "ready", "keys": 2}));

    Ok(())
}

#[tokio::test]
async fn test_ready_fails_on_empty_keystore() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(Keystore::new(), false).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");

    Ok(())
}

#[tokio::test]
async fn test_ready_fails_when_provider_unavailable() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn_with_provider(
        Arc::new(MockKeystoreProvider::failing()),
        test_config(Purpose::Local, false),
    )
    .await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(one_key_keystore()?, true).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
