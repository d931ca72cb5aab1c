//! HTTP error mapping — the one piece of logic this crate owns.
//!
//! Translates [`VaultError`] kinds to status codes and JSON bodies. No
//! decision-making happens here: the core has already collapsed login
//! failures to a generic error and downgraded decryption failures, so the
//! mapping is mechanical.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coffre_vault::VaultError;
use serde_json::json;

/// Wrapper so `VaultError` can flow out of handlers with `?`.
#[derive(Debug)]
pub struct ApiError(pub VaultError);

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            VaultError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            VaultError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, json!({ "error": "not logged in" }))
            }
            VaultError::IncorrectCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "incorrect credentials" }),
            ),
            VaultError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            VaultError::VaultLocked => {
                (StatusCode::LOCKED, json!({ "error": "vault is locked" }))
            }
            VaultError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "not found" })),
            VaultError::LockedOut { lockout_seconds } => (
                StatusCode::LOCKED,
                json!({ "error": "login locked", "lockout_seconds": lockout_seconds }),
            ),
            VaultError::Crypto(_) | VaultError::Database(_) => {
                // Never leak crypto or storage detail to the client.
                tracing::error!(error = %self.0, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
