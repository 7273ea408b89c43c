//! SSO — OAuth2 authorization-code exchange and account
//! provisioning.
//!
//! The CSRF `state` parameter is itself a short-lived signed token
//! carrying the requested portal and a random nonce, so no
//! server-side session entry is needed for the provider round-trip.

use std::sync::Arc;

use chrono::{Duration, Utc};
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::portal::PortalRegistry;
use portico_core::models::user::AuthProvider;
use portico_core::models::user::{CreateUser, ProvisionSsoUser, UserRecord};
use portico_core::repository::UserDirectory;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::password;
use crate::provider::IdentityProvider;
use crate::token::{Claims, TokenCodec};

/// Signed contents of the OAuth2 `state` parameter.
#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    portal: String,
    nonce: String,
    iat: i64,
    exp: i64,
}

/// Result of a completed SSO exchange.
#[derive(Debug)]
pub struct SsoLogin {
    /// Portico access token, single-portal shape.
    pub access_token: String,
    /// Portico refresh token, same portal.
    pub refresh_token: String,
    /// Raw provider token, set as its own cookie for later
    /// profile-fetch calls.
    pub provider_access_token: String,
    /// Portal frontend URL to redirect the browser to.
    pub redirect_url: String,
    pub expires_in: u64,
}

/// Drives one authorization-code-grant exchange end to end.
pub struct SsoExchanger<P: IdentityProvider, U: UserDirectory> {
    provider: P,
    users: U,
    codec: Arc<TokenCodec>,
    registry: PortalRegistry,
    config: AuthConfig,
}

impl<P: IdentityProvider, U: UserDirectory> SsoExchanger<P, U> {
    pub fn new(
        provider: P,
        users: U,
        codec: Arc<TokenCodec>,
        registry: PortalRegistry,
        config: AuthConfig,
    ) -> Self {
        Self {
            provider,
            users,
            codec,
            registry,
            config,
        }
    }

    /// Build the provider authorization URL for `portal`.
    pub fn begin(&self, portal: &str) -> PorticoResult<String> {
        self.registry.get(portal)?;

        let now = Utc::now().timestamp();
        let state = self.codec.issue_custom(&StateClaims {
            portal: portal.to_string(),
            nonce: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.sso_state_ttl_secs as i64,
        })?;

        Ok(self.provider.authorize_url(&state))
    }

    /// Verify `state`, exchange `code`, resolve or provision the
    /// local account, and issue portal-scoped tokens.
    pub async fn complete(&self, code: &str, state: &str) -> PorticoResult<SsoLogin> {
        // State mismatch (bad signature, expiry, tampering) is fatal;
        // the comparison is an HMAC verification, not a string
        // compare.
        let state_claims: StateClaims = self.codec.verify_custom(state).map_err(|e| {
            warn!(error = %e, "SSO state verification failed");
            PorticoError::InvalidCredential
        })?;

        let portal = self.registry.get(&state_claims.portal)?;

        let provider_token = self.provider.exchange_code(code).await?;
        let profile = self
            .provider
            .fetch_profile(&provider_token.access_token)
            .await?;

        let user = match self.users.find_by_email(&profile.email).await? {
            Some(existing) => existing,
            None => self.provision(&profile).await?,
        };

        let access_token = self.codec.issue(
            self.portal_claims(&user, &portal.name),
            Duration::seconds(self.config.access_token_ttl_secs as i64),
        )?;
        let refresh_token = self.codec.issue(
            self.portal_claims(&user, &portal.name),
            Duration::seconds(self.config.refresh_token_ttl_secs as i64),
        )?;

        Ok(SsoLogin {
            access_token,
            refresh_token,
            provider_access_token: provider_token.access_token,
            redirect_url: portal.frontend_url.clone(),
            expires_in: self.config.access_token_ttl_secs,
        })
    }

    fn portal_claims(&self, user: &UserRecord, portal: &str) -> Claims {
        Claims::single_portal(
            user.id.to_string(),
            user.email.clone(),
            portal,
            Some(AuthProvider::Microsoft.as_str().into()),
        )
    }

    /// Create contact + user + baseline grant. The random password is
    /// hashed and discarded — the account is SSO-only. The store
    /// applies the inserts atomically; a partial failure leaves no
    /// half-provisioned account behind.
    async fn provision(&self, profile: &crate::provider::ProviderProfile) -> PorticoResult<UserRecord> {
        let password_hash = password::hash_password(&password::random_password())
            .map_err(|e| PorticoError::Provisioning(e.to_string()))?;

        self.users
            .provision_sso_user(ProvisionSsoUser {
                user: CreateUser {
                    entity_id: self.config.default_entity_id,
                    username: profile.email.clone(),
                    email: profile.email.clone(),
                    password_hash,
                    auth_provider: AuthProvider::Microsoft,
                    first_name: profile.first_name.clone(),
                    last_name: profile.last_name.clone(),
                    phone: profile.phone.clone(),
                },
                default_module_id: self.config.default_module_id,
                default_role_id: self.config.default_role_id,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderProfile, ProviderToken};
    use portico_core::models::user::UserStatus;
    use std::sync::Mutex;

    struct StubProvider {
        fail_exchange: bool,
    }

    impl IdentityProvider for StubProvider {
        fn authorize_url(&self, state: &str) -> String {
            format!("https://idp.test/authorize?state={state}")
        }

        async fn exchange_code(&self, code: &str) -> PorticoResult<ProviderToken> {
            if self.fail_exchange {
                return Err(PorticoError::ProviderExchange("upstream said no".into()));
            }
            Ok(ProviderToken {
                access_token: format!("provider-token-for-{code}"),
            })
        }

        async fn fetch_profile(&self, _access_token: &str) -> PorticoResult<ProviderProfile> {
            Ok(ProviderProfile {
                email: "sso.user@example.com".into(),
                first_name: "Sso".into(),
                last_name: "User".into(),
                display_name: "Sso User".into(),
                phone: None,
            })
        }
    }

    #[derive(Default)]
    struct StubDirectory {
        users: Mutex<Vec<UserRecord>>,
        provisioned: Mutex<Vec<ProvisionSsoUser>>,
    }

    impl UserDirectory for StubDirectory {
        async fn find_active_by_login(
            &self,
            _entity_id: i64,
            _login: &str,
        ) -> PorticoResult<Option<UserRecord>> {
            Ok(None)
        }

        async fn find_by_email(&self, email: &str) -> PorticoResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn provision_sso_user(&self, input: ProvisionSsoUser) -> PorticoResult<UserRecord> {
            let now = Utc::now();
            let record = UserRecord {
                id: Uuid::new_v4(),
                entity_id: input.user.entity_id,
                username: input.user.username.clone(),
                email: input.user.email.clone(),
                password_hash: input.user.password_hash.clone(),
                status: UserStatus::Active,
                auth_provider: input.user.auth_provider,
                first_name: input.user.first_name.clone(),
                last_name: input.user.last_name.clone(),
                phone: input.user.phone.clone(),
                created_at: now,
                updated_at: now,
            };
            self.users.lock().unwrap().push(record.clone());
            self.provisioned.lock().unwrap().push(input);
            Ok(record)
        }
    }

    fn exchanger(fail_exchange: bool) -> SsoExchanger<StubProvider, StubDirectory> {
        SsoExchanger::new(
            StubProvider { fail_exchange },
            StubDirectory::default(),
            Arc::new(TokenCodec::new("sso-secret")),
            PortalRegistry::default(),
            AuthConfig {
                jwt_secret: "sso-secret".into(),
                ..AuthConfig::default()
            },
        )
    }

    fn state_for(ex: &SsoExchanger<StubProvider, StubDirectory>, portal: &str) -> String {
        let url = ex.begin(portal).unwrap();
        let (_, state) = url.rsplit_once("state=").unwrap();
        state.to_string()
    }

    #[tokio::test]
    async fn begin_rejects_unknown_portal() {
        let err = exchanger(false).begin("intranet").unwrap_err();
        assert!(matches!(err, PorticoError::UnknownPortal { .. }));
    }

    #[tokio::test]
    async fn complete_provisions_unknown_user_and_issues_tokens() {
        let ex = exchanger(false);
        let state = state_for(&ex, "vms");

        let login = ex.complete("auth-code", &state).await.unwrap();
        assert_eq!(login.redirect_url, "https://vms.example.com");
        assert_eq!(login.provider_access_token, "provider-token-for-auth-code");

        let codec = TokenCodec::new("sso-secret");
        let claims = codec.verify(&login.access_token).unwrap();
        assert_eq!(claims.domain, Some("vms".to_string()));
        assert_eq!(claims.allowed_domains, None);
        assert_eq!(claims.auth_provider, Some("microsoft".to_string()));
        assert_eq!(claims.username, "sso.user@example.com");

        let provisioned = ex.users.provisioned.lock().unwrap();
        assert_eq!(provisioned.len(), 1);
        assert_eq!(provisioned[0].user.email, "sso.user@example.com");
    }

    #[tokio::test]
    async fn complete_reuses_existing_account() {
        let ex = exchanger(false);
        let state = state_for(&ex, "vms");

        ex.complete("code-1", &state).await.unwrap();
        let state2 = state_for(&ex, "vms");
        ex.complete("code-2", &state2).await.unwrap();

        // Second login resolves the existing row; no second
        // provisioning.
        assert_eq!(ex.users.provisioned.lock().unwrap().len(), 1);
        assert_eq!(ex.users.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completed_token_passes_the_session_guard() {
        let ex = exchanger(false);
        let state = state_for(&ex, "vms");
        let login = ex.complete("auth-code", &state).await.unwrap();

        let guard = crate::guard::SessionGuard::new(
            Arc::new(TokenCodec::new("sso-secret")),
            PortalRegistry::default().names(),
        );
        let claims = guard.authenticate(Some(&login.access_token), None).unwrap();
        assert_eq!(claims.domain.as_deref(), Some("vms"));
    }

    #[tokio::test]
    async fn tampered_state_is_fatal() {
        let ex = exchanger(false);
        let mut state = state_for(&ex, "vms");
        state.push('x');

        let err = ex.complete("auth-code", &state).await.unwrap_err();
        assert!(matches!(err, PorticoError::InvalidCredential));
    }

    #[tokio::test]
    async fn provider_failure_aborts_without_tokens() {
        let ex = exchanger(true);
        let state = state_for(&ex, "vms");

        let err = ex.complete("auth-code", &state).await.unwrap_err();
        assert!(matches!(err, PorticoError::ProviderExchange(_)));
        assert!(ex.users.users.lock().unwrap().is_empty());
    }
}
