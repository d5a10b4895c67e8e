//! Integration tests for the JWKS keystore provider
//!
//! A wiremock server stands in for the key publisher.

use auth_service::auth::{TokenVerifier, VerifierConfig};
use auth_service::errors::KeystoreError;
use auth_service::keystore::jwks::JwksKeystoreProvider;
use auth_service::keystore::KeystoreProvider;
use auth_test_utils::{test_ed25519_key, TestTokenBuilder};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/.well-known/jwks.json";

async fn jwks_server(body: serde_json::Value, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

#[tokio::test]
async fn test_jwks_keys_verify_tokens() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(1)?;
    let server = jwks_server(json!({"keys": [key.to_jwk("publisher-1")]}), 1).await;
    let provider = JwksKeystoreProvider::new(jwks_url(&server));

    let keystore = provider.keystore().await?;
    let token = TestTokenBuilder::new()
        .for_user("alice")
        .with_kid("publisher-1")
        .sign_eddsa(&key.private_key_pkcs8)?;

    let verified = TokenVerifier::new(VerifierConfig::default()).verify(&token, &keystore)?;

    assert_eq!(verified.key_id, "publisher-1");
    Ok(())
}

#[tokio::test]
async fn test_jwks_cached_within_ttl() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(2)?;
    // MockServer verifies the expectation on drop
    let server = jwks_server(json!({"keys": [key.to_jwk("k1")]}), 1).await;
    let provider = JwksKeystoreProvider::with_ttl(jwks_url(&server), Duration::from_secs(300));

    let first = provider.keystore().await?;
    let second = provider.keystore().await?;

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_jwks_refetched_after_ttl() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(3)?;
    let server = jwks_server(json!({"keys": [key.to_jwk("k1")]}), 2).await;
    let provider = JwksKeystoreProvider::with_ttl(jwks_url(&server), Duration::from_millis(50));

    provider.keystore().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    provider.keystore().await?;

    Ok(())
}

#[tokio::test]
async fn test_jwks_skips_foreign_and_duplicate_keys() -> Result<(), anyhow::Error> {
    let first = test_ed25519_key(4)?;
    let second = test_ed25519_key(5)?;
    let body = json!({"keys": [
        {"kty": "RSA", "kid": "rsa-key", "n": "AQAB", "e": "AQAB"},
        {"kty": "OKP", "kid": "x25519", "crv": "X25519", "x": "AAAA"},
        first.to_jwk("shared"),
        second.to_jwk("shared"),
    ]});
    let server = jwks_server(body, 1).await;
    let provider = JwksKeystoreProvider::new(jwks_url(&server));

    let keystore = provider.keystore().await?;

    assert_eq!(keystore.len(), 1);
    assert!(keystore.contains("shared"));

    // First occurrence wins
    let token = TestTokenBuilder::new()
        .with_kid("shared")
        .sign_eddsa(&first.private_key_pkcs8)?;
    assert!(TokenVerifier::new(VerifierConfig::default())
        .verify(&token, &keystore)
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn test_jwks_server_error_is_unavailable() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let provider = JwksKeystoreProvider::new(jwks_url(&server));

    let err = provider.keystore().await.unwrap_err();

    assert!(matches!(err, KeystoreError::Unavailable(_)));
    Ok(())
}

#[tokio::test]
async fn test_jwks_garbage_body_is_unavailable() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    let provider = JwksKeystoreProvider::new(jwks_url(&server));

    let err = provider.keystore().await.unwrap_err();

    assert!(matches!(err, KeystoreError::Unavailable(_)));
    Ok(())
}

#[tokio::test]
async fn test_jwks_failure_is_not_cached() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    let provider = JwksKeystoreProvider::new(jwks_url(&server));

    assert!(provider.keystore().await.is_err());
    assert!(provider.keystore().await.is_err());
    Ok(())
}
