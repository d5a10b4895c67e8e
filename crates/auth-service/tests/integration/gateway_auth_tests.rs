//! Integration tests for the authentication middleware
//!
//! Drives `/api/v1/me` over HTTP with header, query and missing tokens, with
//! authentication both required and optional.

use crate::server_harness::TestGatewayServer;
use auth_service::keystore::{KeyMaterial, Keystore};
use auth_test_utils::{test_hmac_secret, TestTokenBuilder};
use reqwest::StatusCode;
use serde_json::Value;

fn gateway_keystore() -> Result<Keystore, anyhow::Error> {
    Ok(Keystore::new()
        .with_key("default", KeyMaterial::symmetric(test_hmac_secret(1))?)?
        .with_key("k2", KeyMaterial::symmetric(test_hmac_secret(2))?)?)
}

fn me_url(server: &TestGatewayServer) -> String {
    format!("{}/api/v1/me", server.url())
}

async fn assert_unauthorized(
    response: reqwest::Response,
    expected_code: &str,
) -> Result<(), anyhow::Error> {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let challenge = response
        .headers()
        .get("www-authenticate")
        .map(|v| v.to_str().unwrap_or_default().to_string())
        .unwrap_or_default();
    assert!(
        challenge.starts_with("Bearer"),
        "401 must carry a Bearer challenge, got '{challenge}'"
    );

    let body: Value = response.json().await?;
    assert_eq!(body["errors"]["code"], expected_code);
    Ok(())
}

// ============================================================================
// Successful Authentication
// ============================================================================

#[tokio::test]
async fn test_bearer_header_authenticates() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, true).await?;
    let token = TestTokenBuilder::new()
        .for_user("alice")
        .with_kid("k2")
        .sign_hs256(&test_hmac_secret(2))?;

    let response = reqwest::Client::new()
        .get(me_url(&server))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["key_id"], "k2");
    assert_eq!(body["claims"]["sub"], "alice");

    Ok(())
}

#[tokio::test]
async fn test_query_token_authenticates() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, true).await?;
    let token = TestTokenBuilder::new()
        .for_user("ws-client")
        .sign_hs256(&test_hmac_secret(1))?;

    let response = reqwest::Client::new()
        .get(me_url(&server))
        .query(&[("token", token.as_str())])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["key_id"], "default");
    assert_eq!(body["claims"]["sub"], "ws-client");

    Ok(())
}

#[tokio::test]
async fn test_query_token_takes_precedence_over_header() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, true).await?;
    let header_token = TestTokenBuilder::new()
        .for_user("from-header")
        .sign_hs256(&test_hmac_secret(1))?;
    let query_token = TestTokenBuilder::new()
        .for_user("from-query")
        .sign_hs256(&test_hmac_secret(1))?;

    let response = reqwest::Client::new()
        .get(me_url(&server))
        .bearer_auth(&header_token)
        .query(&[("token", query_token.as_str())])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["claims"]["sub"], "from-query");

    Ok(())
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_malformed_headers_rejected() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, false).await?;
    let client = reqwest::Client::new();

    for header in ["Basic abc", "Bearer", "Bearer ", "bearer abc", "Bearer a b"] {
        let response = client
            .get(me_url(&server))
            .header("Authorization", header)
            .send()
            .await?;
        assert_unauthorized(response, "MALFORMED_AUTHORIZATION_HEADER").await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_malformed_headers_rejected_when_required() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, true).await?;
    let client = reqwest::Client::new();

    for header in ["Basic abc", "Bearer"] {
        let response = client
            .get(me_url(&server))
            .header("Authorization", header)
            .send()
            .await?;
        assert_unauthorized(response, "MALFORMED_AUTHORIZATION_HEADER").await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_token_rejected_when_required() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, true).await?;

    let response = reqwest::get(me_url(&server)).await?;

    assert_unauthorized(response, "MISSING_TOKEN").await
}

#[tokio::test]
async fn test_empty_query_token_counts_as_missing() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, true).await?;

    let response = reqwest::get(format!("{}?token=", me_url(&server))).await?;

    assert_unauthorized(response, "MISSING_TOKEN").await
}

#[tokio::test]
async fn test_unknown_signer_rejected() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, false).await?;
    let token = TestTokenBuilder::new().sign_hs256(&test_hmac_secret(9))?;

    let response = reqwest::Client::new()
        .get(me_url(&server))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_unauthorized(response, "NO_MATCHING_KEY").await
}

#[tokio::test]
async fn test_expired_token_rejected_with_cause() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, false).await?;
    let token = TestTokenBuilder::new()
        .expired()
        .sign_hs256(&test_hmac_secret(1))?;

    let response = reqwest::Client::new()
        .get(me_url(&server))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["errors"]["code"], "VERIFICATION_ERROR");
    assert!(body["errors"]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("expired"));

    Ok(())
}

// ============================================================================
// Optional Authentication
// ============================================================================

#[tokio::test]
async fn test_anonymous_request_passes_when_optional() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, false).await?;

    let response = reqwest::get(me_url(&server)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body, serde_json::json!({"authenticated": false}));

    Ok(())
}

#[tokio::test]
async fn test_invalid_token_rejected_even_when_optional() -> Result<(), anyhow::Error> {
    let server = TestGatewayServer::spawn(gateway_keystore()?, false).await?;

    let response = reqwest::Client::new()
        .get(me_url(&server))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
