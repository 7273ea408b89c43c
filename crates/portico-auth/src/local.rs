//! Local password authentication.

use std::sync::Arc;

use chrono::Duration;
use portico_core::error::PorticoResult;
use portico_core::models::portal::PortalRegistry;
use portico_core::repository::UserDirectory;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token::{Claims, TokenCodec};

/// Input for the password login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
    /// Tenant (entity) the credentials are scoped to.
    pub entity_id: i64,
    /// Portal the caller wants a session for.
    pub portal: String,
}

/// Successful login result. Tokens are self-contained; no session
/// row is persisted.
#[derive(Debug)]
pub struct TokenPair {
    /// Access token in the multi-portal shape
    /// (`allowed_domains = [portal]`).
    pub access_token: String,
    /// Refresh token in the single-portal shape (`domain = portal`).
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Validates username/password + entity against the user directory
/// and issues a token pair.
pub struct LocalAuthenticator<U: UserDirectory> {
    users: U,
    codec: Arc<TokenCodec>,
    registry: PortalRegistry,
    config: AuthConfig,
}

impl<U: UserDirectory> LocalAuthenticator<U> {
    pub fn new(
        users: U,
        codec: Arc<TokenCodec>,
        registry: PortalRegistry,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            codec,
            registry,
            config,
        }
    }

    /// Authenticate and issue tokens.
    ///
    /// Staff portals reject password login outright — SSO is
    /// mandatory there, regardless of credentials. "No such user"
    /// and "wrong password" produce the same rejection.
    pub async fn login(&self, input: LoginInput) -> PorticoResult<TokenPair> {
        let portal = self.registry.get(&input.portal)?;
        if !portal.local_login {
            return Err(AuthError::LocalLoginDisabled(portal.name.clone()).into());
        }

        let user = self
            .users
            .find_active_by_login(input.entity_id, &input.username_or_email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = password::verify_password(&input.password, &user.password_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_claims = Claims::multi_portal(
            user.id.to_string(),
            user.username.clone(),
            vec![portal.name.clone()],
            Some(user.entity_id),
        );
        let access_token = self.codec.issue(
            access_claims,
            Duration::seconds(self.config.access_token_ttl_secs as i64),
        )?;

        let refresh_claims = Claims::single_portal(
            user.id.to_string(),
            user.username.clone(),
            portal.name.clone(),
            Some("local".into()),
        );
        let refresh_token = self.codec.issue(
            refresh_claims,
            Duration::seconds(self.config.refresh_token_ttl_secs as i64),
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_ttl_secs,
        })
    }
}
