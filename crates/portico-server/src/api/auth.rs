//! Authentication routes: password login, SSO, refresh, session,
//! logout, and forgot-password.

use axum::extract::{Extension, Query, State};
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use portico_auth::local::LoginInput;
use portico_auth::token::Claims;
use portico_core::activity::ActivityLogger;
use portico_core::error::PorticoError;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::AppState;
use crate::cookies;
use crate::http::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/sso/login", get(sso_login))
        .route("/sso/callback", get(sso_callback))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/forgot-password", post(forgot_password))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
    portal: String,
    entity_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    expires_in: u64,
}

/// Password login. Vendor portal only; staff portals answer 400.
/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), ApiError> {
    let portal = body.portal.clone();
    let username = body.username.clone();

    let pair = state
        .local
        .login(LoginInput {
            username_or_email: body.username,
            password: body.password,
            entity_id: body.entity_id.unwrap_or(state.settings.auth.default_entity_id),
            portal: body.portal,
        })
        .await?;

    state.activity.record(
        "login",
        &json!({ "portal": portal, "provider": "local" }),
        &portal,
        &username,
    );

    let domain = state.settings.cookie_domain.as_deref();
    let jar = jar
        .add(cookies::access_cookie(
            &pair.access_token,
            domain,
            pair.expires_in as i64,
        ))
        .add(cookies::refresh_cookie(
            &pair.refresh_token,
            domain,
            state.settings.auth.refresh_token_ttl_secs as i64,
        ));

    Ok((
        jar,
        Json(TokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: pair.expires_in,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct SsoLoginParams {
    portal: String,
}

/// Redirect to the identity provider's authorization URL.
/// GET /auth/sso/login?portal=
async fn sso_login(
    State(state): State<AppState>,
    Query(params): Query<SsoLoginParams>,
) -> Result<Redirect, ApiError> {
    let url = state.sso.begin(&params.portal)?;
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: String,
    state: String,
}

/// Provider callback — finish the exchange, set cookies, and bounce
/// the browser to the portal frontend.
/// GET /auth/sso/callback?code=&state=
async fn sso_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let login = state.sso.complete(&params.code, &params.state).await?;

    let domain = state.settings.cookie_domain.as_deref();
    let jar = jar
        .add(cookies::access_cookie(
            &login.access_token,
            domain,
            login.expires_in as i64,
        ))
        .add(cookies::refresh_cookie(
            &login.refresh_token,
            domain,
            state.settings.auth.refresh_token_ttl_secs as i64,
        ))
        .add(cookies::provider_cookie(
            &login.provider_access_token,
            domain,
            login.expires_in as i64,
        ));

    Ok((jar, Redirect::temporary(&login.redirect_url)))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    portal: String,
    /// Explicit token; falls back to the refresh cookie.
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
}

/// Exchange a refresh token for a fresh short-lived access token.
/// POST /auth/refresh
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> Result<(CookieJar, Json<RefreshResponse>), ApiError> {
    let token = body
        .refresh_token
        .or_else(|| jar.get(cookies::REFRESH_COOKIE).map(|c| c.value().to_string()))
        .ok_or(PorticoError::MissingCredential)?;

    let issued = state.refresh.refresh(&token, &body.portal)?;

    let domain = state.settings.cookie_domain.as_deref();
    let jar = jar.add(cookies::access_cookie(
        &issued.access_token,
        domain,
        issued.expires_in as i64,
    ));

    Ok((
        jar,
        Json(RefreshResponse {
            access_token: issued.access_token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
        }),
    ))
}

/// Clear the auth cookies. Tokens themselves stay valid until expiry;
/// there is no server-side revocation list.
/// POST /auth/logout
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let domain = state.settings.cookie_domain.as_deref();
    let mut jar = jar;
    for cookie in cookies::clear_cookies(domain) {
        jar = jar.add(cookie);
    }
    (jar, Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    /// When present, also verify an approved grant for this portal.
    portal: Option<String>,
}

/// Return the verified claims of the current session.
/// GET /auth/session
async fn session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SessionQuery>,
) -> Result<Json<Claims>, ApiError> {
    if let Some(portal) = params.portal {
        state.registry.get(&portal)?;
        if !claims.permits(&portal) {
            return Err(PorticoError::PortalMismatch {
                reason: "token does not cover this portal".into(),
            }
            .into());
        }
        if !state.workflow.check_access(&claims.username, &portal).await? {
            return Err(ApiError::Forbidden);
        }
    }
    Ok(Json(claims))
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

/// Kick off a password reset. Always answers 200 so the response
/// carries no account-existence signal.
/// POST /auth/forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.reset.request_reset(&body.email).await?;
    Ok(Json(json!({ "status": "ok" })))
}
