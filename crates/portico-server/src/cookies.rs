//! Auth cookie builders.
//!
//! The portal frontends live on different origins than this API, so
//! every auth cookie is `Secure` + `SameSite=None` and scoped to the
//! shared parent domain. The provider cookie is readable by frontend
//! code that calls Graph directly; the session cookies are http-only.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Cookie name for the Portico access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the Portico refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";
/// Cookie name for the raw Microsoft access token.
pub const PROVIDER_COOKIE: &str = "microsoft_access_token";

fn build(
    name: &str,
    value: String,
    http_only: bool,
    domain: Option<&str>,
    max_age_secs: i64,
) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), value))
        .http_only(http_only)
        .secure(true)
        .same_site(SameSite::None)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age_secs));
    if let Some(domain) = domain {
        builder = builder.domain(domain.to_string());
    }
    builder.build()
}

pub fn access_cookie(token: &str, domain: Option<&str>, max_age_secs: i64) -> Cookie<'static> {
    build(ACCESS_COOKIE, token.to_string(), true, domain, max_age_secs)
}

pub fn refresh_cookie(token: &str, domain: Option<&str>, max_age_secs: i64) -> Cookie<'static> {
    build(REFRESH_COOKIE, token.to_string(), true, domain, max_age_secs)
}

pub fn provider_cookie(token: &str, domain: Option<&str>, max_age_secs: i64) -> Cookie<'static> {
    build(PROVIDER_COOKIE, token.to_string(), false, domain, max_age_secs)
}

/// Expired replacements that clear the auth state on logout.
pub fn clear_cookies(domain: Option<&str>) -> [Cookie<'static>; 3] {
    [
        build(ACCESS_COOKIE, String::new(), true, domain, 0),
        build(REFRESH_COOKIE, String::new(), true, domain, 0),
        build(PROVIDER_COOKIE, String::new(), false, domain, 0),
    ]
}
