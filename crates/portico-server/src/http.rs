//! HTTP error translation.
//!
//! The status mapping is the only place the error taxonomy meets
//! HTTP. Credential failures collapse to a generic 401 body so
//! responses never distinguish "no such user" from "wrong password"
//! or leak token internals; store and provisioning failures collapse
//! to a generic 500 with the specific cause only in the logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portico_core::error::PorticoError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Portico(PorticoError),
    /// Authenticated but not approved for the requested portal.
    Forbidden,
}

impl From<PorticoError> for ApiError {
    fn from(err: PorticoError) -> Self {
        ApiError::Portico(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "access not approved".to_string()),
            ApiError::Portico(err) => match err {
                PorticoError::MissingCredential
                | PorticoError::InvalidCredential
                | PorticoError::ExpiredToken
                | PorticoError::PortalMismatch { .. } => (
                    StatusCode::UNAUTHORIZED,
                    "invalid or missing credential".to_string(),
                ),
                PorticoError::UnknownPortal { .. }
                | PorticoError::LocalLoginDisabled { .. }
                | PorticoError::InvalidTransition { .. }
                | PorticoError::AlreadyExists { .. } => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PorticoError::AccessDenied { .. } => {
                    (StatusCode::FORBIDDEN, "access not approved".to_string())
                }
                PorticoError::StateNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
                PorticoError::ProviderExchange(_) => {
                    error!(error = %err, "identity provider exchange failed");
                    (
                        StatusCode::BAD_GATEWAY,
                        "identity provider unavailable".to_string(),
                    )
                }
                PorticoError::Provisioning(_)
                | PorticoError::Database(_)
                | PorticoError::Notification(_)
                | PorticoError::Internal(_) => {
                    error!(error = %err, "internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
