//! Authentication middleware.
//!
//! Extracts a bearer token from the configured query parameter or the
//! `Authorization` header, verifies it against one keystore snapshot, and
//! injects an [`AuthContext`] into request extensions.
//!
//! # Token sources
//!
//! ```text
//! GET /path?token=<token>
//! Authorization: Bearer <token>
//! ```
//!
//! A present but malformed `Authorization` header always fails, even when
//! authentication is optional or a query token is also present. When both
//! sources carry a token, the query parameter wins.

use crate::auth::{AuthContext, TokenVerifier};
use crate::errors::{AuthError, ServiceError};
use crate::keystore::KeystoreProvider;
use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Default query parameter carrying a token.
pub const DEFAULT_TOKEN_QUERY_PARAM: &str = "token";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub keystore_provider: Arc<dyn KeystoreProvider>,
    pub verifier: Arc<TokenVerifier>,

    /// Reject requests without a token.
    pub require_auth: bool,

    /// Query parameter name checked before the header.
    pub token_query_param: String,
}

/// Authentication middleware.
///
/// # Response
///
/// - 401 with `{"errors": {...}}` and `WWW-Authenticate` on any
///   authentication failure
/// - 503 if the keystore cannot be fetched
/// - Otherwise continues, with `AuthContext` in extensions when a token
///   verified
#[instrument(skip_all, name = "auth.middleware.authenticate")]
pub async fn authenticate(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let Some(token) = extract_token(req.headers(), req.uri(), &state.token_query_param)? else {
        if state.require_auth {
            tracing::debug!(target: "auth.middleware", "Missing token");
            return Err(AuthError::MissingToken.into());
        }
        tracing::trace!(target: "auth.middleware", "Anonymous request passed through");
        return Ok(next.run(req).await);
    };

    let keystore = state.keystore_provider.keystore().await?;
    let verified = state.verifier.verify(&token, &keystore)?;

    req.extensions_mut().insert(AuthContext::from(verified));

    Ok(next.run(req).await)
}

/// Find the request's token.
///
/// # Errors
///
/// `MalformedAuthorizationHeader` if an `Authorization` header is present
/// but is not `Bearer <token>`.
pub fn extract_token(
    headers: &HeaderMap,
    uri: &Uri,
    query_param: &str,
) -> Result<Option<String>, AuthError> {
    // Validate the header first so a bad header is never masked
    let from_header = bearer_token(headers)?;

    if let Some(token) = query_token(uri, query_param) {
        return Ok(Some(token));
    }

    Ok(from_header.map(ToString::to_string))
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "auth.middleware", "Authorization header is not visible ASCII");
        AuthError::MalformedAuthorizationHeader
    })?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(Some(token)),
        _ => {
            tracing::debug!(target: "auth.middleware", "Invalid Authorization header format");
            Err(AuthError::MalformedAuthorizationHeader)
        }
    }
}

fn query_token(uri: &Uri, query_param: &str) -> Option<String> {
    uri.query()?;
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove(query_param).filter(|token| !token.is_empty())
}

/// Extension trait for reading the auth context from a request.
pub trait AuthContextExt {
    /// Returns `None` for anonymous requests or routes without the middleware.
    fn auth_context(&self) -> Option<&AuthContext>;
}

impl<B> AuthContextExt for axum::http::Request<B> {
    fn auth_context(&self) -> Option<&AuthContext> {
        self.extensions().get::<AuthContext>()
    }
}
