//! Environment-driven server settings, loaded once at startup.

use portico_auth::{AuthConfig, OAuthConfig};
use portico_core::models::portal::{Portal, PortalRegistry};
use portico_db::DbConfig;
use thiserror::Error;

use crate::mailer::SmtpConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Everything the server reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Domain attribute stamped on auth cookies. None for host-only
    /// cookies in local development.
    pub cookie_domain: Option<String>,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub oauth: OAuthConfig,
    pub smtp: SmtpConfig,
    pub registry: PortalRegistry,
}

fn var(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn var_or(key: &'static str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

fn require(key: &'static str) -> Result<String, SettingsError> {
    var(key).ok_or(SettingsError::Missing(key))
}

fn parse_u64(key: &'static str, default: u64) -> Result<u64, SettingsError> {
    match var(key) {
        Some(raw) => raw.parse().map_err(|e| SettingsError::Invalid {
            key,
            reason: format!("{e}"),
        }),
        None => Ok(default),
    }
}

fn csv(key: &'static str) -> Vec<String> {
    var(key)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Settings {
    /// Read and validate the full configuration. Fails fast on a
    /// missing secret or malformed value rather than limping along.
    pub fn from_env() -> Result<Self, SettingsError> {
        let jwt_secret = require("PORTICO_JWT_SECRET")?;
        let defaults = AuthConfig::default();

        let auth = AuthConfig {
            jwt_secret,
            access_token_ttl_secs: parse_u64(
                "PORTICO_ACCESS_TOKEN_TTL_SECS",
                defaults.access_token_ttl_secs,
            )?,
            refresh_token_ttl_secs: parse_u64(
                "PORTICO_REFRESH_TOKEN_TTL_SECS",
                defaults.refresh_token_ttl_secs,
            )?,
            refreshed_access_ttl_secs: defaults.refreshed_access_ttl_secs,
            sso_state_ttl_secs: defaults.sso_state_ttl_secs,
            reset_token_ttl_secs: defaults.reset_token_ttl_secs,
            default_entity_id: defaults.default_entity_id,
            default_module_id: defaults.default_module_id,
            default_role_id: defaults.default_role_id,
            approval_link_base: var_or(
                "PORTICO_APPROVAL_LINK_BASE",
                &defaults.approval_link_base,
            ),
            reset_link_base: var_or("PORTICO_RESET_LINK_BASE", &defaults.reset_link_base),
            module_admin_recipients: csv("PORTICO_ADMIN_RECIPIENTS"),
        };

        let tenant = var_or("PORTICO_OAUTH_TENANT", "common");
        let oauth_defaults = OAuthConfig::default();
        let oauth = OAuthConfig {
            client_id: var_or("PORTICO_OAUTH_CLIENT_ID", ""),
            client_secret: var_or("PORTICO_OAUTH_CLIENT_SECRET", ""),
            redirect_uri: var_or("PORTICO_OAUTH_REDIRECT_URI", ""),
            authorize_endpoint: format!(
                "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize"
            ),
            token_endpoint: format!(
                "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token"
            ),
            tenant,
            scopes: oauth_defaults.scopes,
            profile_endpoint: oauth_defaults.profile_endpoint,
        };

        let db = DbConfig {
            url: var_or("PORTICO_DB_URL", "127.0.0.1:8000"),
            namespace: var_or("PORTICO_DB_NAMESPACE", "portico"),
            database: var_or("PORTICO_DB_DATABASE", "main"),
            username: var_or("PORTICO_DB_USERNAME", "root"),
            password: var_or("PORTICO_DB_PASSWORD", "root"),
        };

        let smtp = SmtpConfig {
            host: var_or("PORTICO_SMTP_HOST", "localhost"),
            port: parse_u64("PORTICO_SMTP_PORT", 587)? as u16,
            username: var("PORTICO_SMTP_USERNAME"),
            password: var("PORTICO_SMTP_PASSWORD"),
            from: var_or("PORTICO_SMTP_FROM", "no-reply@example.com"),
        };

        Ok(Self {
            bind_addr: var_or("PORTICO_BIND", "0.0.0.0:8080"),
            cookie_domain: var("PORTICO_COOKIE_DOMAIN"),
            db,
            auth,
            oauth,
            smtp,
            registry: registry_from_env(),
        })
    }
}

/// The standard portal set, with frontend URLs overridable per portal
/// (`PORTICO_PORTAL_VMS_URL` and so on).
fn registry_from_env() -> PortalRegistry {
    let portals = PortalRegistry::default()
        .iter()
        .map(|portal| {
            let key = format!("PORTICO_PORTAL_{}_URL", portal.name.to_uppercase());
            let frontend_url = std::env::var(&key)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| portal.frontend_url.clone());
            Portal {
                frontend_url,
                ..portal.clone()
            }
        })
        .collect();
    PortalRegistry::new(portals)
}
