//! Auth service error types.
//!
//! Two layers:
//! - [`AuthError`] is the single "authorization failure" category. Every
//!   variant maps to 401 so the HTTP boundary never has to inspect internals.
//! - [`ServiceError`] is what handlers and middleware return. It wraps
//!   `AuthError` and adds keystore unavailability, which maps to 503.
//!
//! Messages never include key identifiers or key material that were tried
//! during verification.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Classified authentication failure.
///
/// Exactly one kind is surfaced per verification or issuance call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// `Authorization` header present but not `Bearer <token>`.
    #[error("Malformed Authorization header")]
    MalformedAuthorizationHeader,

    /// No token in the request while authentication is required.
    #[error("Missing bearer token")]
    MissingToken,

    /// No keystore entry verified the token signature.
    #[error("No matching key")]
    NoMatchingKey,

    /// Token-level failure: malformed, expired, bad claims, disallowed algorithm.
    #[error("Verification error: {0}")]
    VerificationError(String),

    /// No usable signing key, or the signing primitive failed.
    #[error("Signing error: {0}")]
    SigningError(String),
}

impl AuthError {
    /// Stable machine-readable code for response bodies and metrics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MalformedAuthorizationHeader => "MALFORMED_AUTHORIZATION_HEADER",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::NoMatchingKey => "NO_MATCHING_KEY",
            AuthError::VerificationError(_) => "VERIFICATION_ERROR",
            AuthError::SigningError(_) => "SIGNING_ERROR",
        }
    }

    /// Every authorization failure is a 401.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        401
    }
}

/// Keystore construction and provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeystoreError {
    #[error("Key id must not be empty")]
    EmptyKeyId,

    #[error("Duplicate key id: {0}")]
    DuplicateKeyId(String),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Unknown key purpose: {0}")]
    UnknownPurpose(String),

    #[error("Keystore unavailable: {0}")]
    Unavailable(String),
}

/// Error type returned by handlers and middleware.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Keystore unavailable: {0}")]
    KeystoreUnavailable(String),
}

impl ServiceError {
    /// HTTP status code of the response this error produces.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Auth(e) => e.status_code(),
            ServiceError::KeystoreUnavailable(_) => 503,
        }
    }
}

impl From<KeystoreError> for ServiceError {
    fn from(err: KeystoreError) -> Self {
        ServiceError::KeystoreUnavailable(err.to_string())
    }
}

/// Body for authorization failures: `{"errors": {...}}`.
#[derive(Serialize)]
struct AuthErrorResponse {
    errors: ErrorDetail,
}

/// Body for every other failure: `{"error": {...}}`.
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(target: "auth.errors", code = self.code(), error = %self, "Request rejected");

        let body = AuthErrorResponse {
            errors: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer realm=\"keygate\", error=\"invalid_token\""),
        );
        response
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Auth(err) => err.into_response(),
            ServiceError::KeystoreUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "auth.availability", reason = %reason, "Keystore unavailable");
                let body = ErrorResponse {
                    error: ErrorDetail {
                        code: "SERVICE_UNAVAILABLE".to_string(),
                        message: "Service temporarily unavailable".to_string(),
                    },
                };
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
        }
    }
}
