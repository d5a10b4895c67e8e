//! Current caller handler.
//!
//! Echoes what the auth middleware attached to the request.

use crate::auth::{AuthContext, Payload};
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/api/v1/me`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeResponse {
    pub authenticated: bool,

    /// Id of the key that verified the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    /// Verified claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Payload>,
}

/// Handler for GET /api/v1/me
///
/// ## Response
///
/// ```json
/// {
///   "authenticated": true,
///   "key_id": "default",
///   "claims": {"sub": "alice", "iat": 1234567800}
/// }
/// ```
///
/// Anonymous requests (allowed when authentication is optional) get
/// `{"authenticated": false}`.
#[instrument(skip_all, name = "auth.handlers.me")]
pub async fn get_me(context: Option<Extension<AuthContext>>) -> Json<MeResponse> {
    let response = match context {
        Some(Extension(context)) => MeResponse {
            authenticated: true,
            key_id: Some(context.key_id),
            claims: Some(context.payload),
        },
        None => MeResponse {
            authenticated: false,
            key_id: None,
            claims: None,
        },
    };

    Json(response)
}
