//! Session middleware — cookie-then-bearer extraction feeding the
//! guard.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use portico_core::error::PorticoError;

use crate::api::AppState;
use crate::cookies::ACCESS_COOKIE;
use crate::http::ApiError;

/// Paths that don't require authentication.
const PUBLIC_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/sso/",
    "/auth/refresh",
    "/auth/logout",
    "/auth/forgot-password",
];

/// Verifies the session token on every non-public request.
///
/// The access cookie wins over the Authorization header when both are
/// present. Valid claims are stored as an extension for handlers to
/// read via `Extension<Claims>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let jar = CookieJar::from_headers(req.headers());
    let cookie_token = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());
    let bearer_token = extract_bearer(req.headers()).map(str::to_string);

    match state
        .guard
        .authenticate(cookie_token.as_deref(), bearer_token.as_deref())
    {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => ApiError::from(PorticoError::from(e)).into_response(),
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|prefix| path.starts_with(prefix))
}
