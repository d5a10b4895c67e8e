//! Integration tests for key selection across issuance and verification
//!
//! Exercises the public engine API the way a deployment sees it: keystores
//! built from configuration strings, keys rotated by swapping snapshots.

use auth_service::auth::{IssueOptions, KeyStrategy, Payload, TokenIssuer, TokenVerifier, VerifierConfig};
use auth_service::errors::AuthError;
use auth_service::keystore::{KeyMaterial, Keystore, Purpose};
use auth_test_utils::{test_ed25519_key, test_hmac_secret, TestTokenBuilder, TokenAssertions};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use std::time::Duration;

fn local_verifier() -> TokenVerifier {
    TokenVerifier::new(VerifierConfig {
        purpose: Purpose::Local,
        ..VerifierConfig::default()
    })
}

fn hmac(seed: u8) -> Result<KeyMaterial, anyhow::Error> {
    Ok(KeyMaterial::symmetric(test_hmac_secret(seed))?)
}

// ============================================================================
// Tier Order
// ============================================================================

#[test]
fn test_kid_beats_default() -> Result<(), anyhow::Error> {
    let ks = Keystore::new()
        .with_key("default", hmac(1)?)?
        .with_key("k2", hmac(2)?)?;
    let token = TestTokenBuilder::new()
        .with_kid("k2")
        .sign_hs256(&test_hmac_secret(2))?;

    let verified = local_verifier().verify(&token, &ks)?;

    assert_eq!(verified.key_id, "k2");
    assert_eq!(verified.strategy, KeyStrategy::KeyId);
    Ok(())
}

#[test]
fn test_unknown_kid_falls_back_to_default() -> Result<(), anyhow::Error> {
    let ks = Keystore::new()
        .with_key("default", hmac(1)?)?
        .with_key("k2", hmac(2)?)?;
    let token = TestTokenBuilder::new()
        .with_kid("retired")
        .sign_hs256(&test_hmac_secret(1))?;

    let verified = local_verifier().verify(&token, &ks)?;

    assert_eq!(verified.key_id, "default");
    assert_eq!(verified.strategy, KeyStrategy::Default);
    Ok(())
}

#[test]
fn test_scan_finds_non_default_key() -> Result<(), anyhow::Error> {
    let ks = Keystore::new()
        .with_key("default", hmac(1)?)?
        .with_key("a", hmac(2)?)?
        .with_key("b", hmac(3)?)?;
    let token = TestTokenBuilder::new().sign_hs256(&test_hmac_secret(3))?;

    let verified = local_verifier().verify(&token, &ks)?;

    assert_eq!(verified.key_id, "b");
    assert_eq!(verified.strategy, KeyStrategy::Scan);
    Ok(())
}

#[test]
fn test_claim_failure_under_signing_key_is_not_masked() -> Result<(), anyhow::Error> {
    let ks = Keystore::new().with_key("only", hmac(1)?)?;
    let token = TestTokenBuilder::new()
        .expired()
        .sign_hs256(&test_hmac_secret(1))?;

    let err = local_verifier().verify(&token, &ks).unwrap_err();

    assert_eq!(err, AuthError::VerificationError("token has expired".to_string()));
    Ok(())
}

#[test]
fn test_absent_signer_yields_no_matching_key() -> Result<(), anyhow::Error> {
    let ks = Keystore::new()
        .with_key("a", hmac(1)?)?
        .with_key("b", hmac(2)?)?;
    let token = TestTokenBuilder::new().sign_hs256(&test_hmac_secret(7))?;

    let err = local_verifier().verify(&token, &ks).unwrap_err();

    assert_eq!(err, AuthError::NoMatchingKey);
    Ok(())
}

// ============================================================================
// Rotation
// ============================================================================

#[test]
fn test_rotation_keeps_old_tokens_valid_until_key_removed() -> Result<(), anyhow::Error> {
    let issuer = TokenIssuer::new(Purpose::Local);
    let claims: Payload = json!({"sub": "svc"}).as_object().cloned().unwrap_or_default();

    // Before rotation: "default" is the only key
    let before = Keystore::new().with_key("default", hmac(1)?)?;
    let old_token = issuer.issue(claims.clone(), &before, &IssueOptions::default())?;

    // During rotation: new default, previous key kept under its own id
    let during = Keystore::new()
        .with_key("default", hmac(2)?)?
        .with_key("previous", hmac(1)?)?;
    let verified = local_verifier().verify(&old_token, &during)?;
    assert_eq!(verified.key_id, "previous");
    assert_eq!(verified.strategy, KeyStrategy::Scan);

    let new_token = issuer.issue(claims, &during, &IssueOptions::default())?;
    new_token.assert_signed_by("default");

    // After rotation: previous key gone
    let after = Keystore::new().with_key("default", hmac(2)?)?;
    assert_eq!(
        local_verifier().verify(&old_token, &after).unwrap_err(),
        AuthError::NoMatchingKey
    );
    assert!(local_verifier().verify(&new_token, &after).is_ok());

    Ok(())
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn test_public_round_trip_from_configured_keys() -> Result<(), anyhow::Error> {
    let signer = test_ed25519_key(1)?;
    let other = test_ed25519_key(2)?;
    let keys = format!(
        "default={},other={}",
        signer.private_key_b64(),
        other.public_key_b64()
    );
    let ks = Keystore::parse_key_list(Purpose::Public, &keys)?;
    let claims: Payload = json!({"sub": "alice", "scope": ["read", "write"]})
        .as_object()
        .cloned()
        .unwrap_or_default();

    let token = TokenIssuer::new(Purpose::Public).issue(
        claims.clone(),
        &ks,
        &IssueOptions {
            key_id: None,
            expires_in: Some(Duration::from_secs(600)),
        },
    )?;
    token
        .assert_valid_jwt("EdDSA")
        .assert_signed_by("default")
        .assert_has_claim("exp");

    let verified = TokenVerifier::new(VerifierConfig::default()).verify(&token, &ks)?;

    assert_eq!(verified.payload["sub"], "alice");
    assert_eq!(verified.payload["scope"], claims["scope"]);
    assert_eq!(verified.key_id, "default");
    Ok(())
}

#[test]
fn test_verification_only_key_from_config_accepts_foreign_token() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(3)?;
    let ks = Keystore::parse_key_list(
        Purpose::Public,
        &format!("issuer-1={}", STANDARD.encode(&key.public_key)),
    )?;
    let token = TestTokenBuilder::new()
        .for_user("bob")
        .with_kid("issuer-1")
        .sign_eddsa(&key.private_key_pkcs8)?;

    let verified = TokenVerifier::new(VerifierConfig::default()).verify(&token, &ks)?;

    assert_eq!(verified.key_id, "issuer-1");
    assert_eq!(verified.payload["sub"], "bob");
    Ok(())
}

#[test]
fn test_hs256_token_rejected_by_public_verifier() -> Result<(), anyhow::Error> {
    let key = test_ed25519_key(4)?;
    let ks = Keystore::new().with_key("default", KeyMaterial::ed25519_public(key.public_key)?)?;
    let token = TestTokenBuilder::new().sign_hs256(b"attacker-controlled-secret")?;

    let err = TokenVerifier::new(VerifierConfig::default())
        .verify(&token, &ks)
        .unwrap_err();

    assert!(matches!(err, AuthError::VerificationError(_)));
    Ok(())
}
