//! Identity provider contract and its HTTP (OAuth2) implementation.

use portico_core::error::{PorticoError, PorticoResult};
use serde_json::Value;

/// Token material returned by the provider's code exchange.
#[derive(Debug, Clone)]
pub struct ProviderToken {
    /// Raw provider access token — also surfaced to the client as its
    /// own cookie for later profile-fetch calls.
    pub access_token: String,
}

/// Resource-owner profile fetched from the provider.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub phone: Option<String>,
}

/// OAuth2 authorization-code endpoints plus a profile fetch. One
/// attempt per call; failures surface immediately, there is no
/// retry/backoff.
pub trait IdentityProvider: Send + Sync {
    /// Build the provider authorization URL carrying `state`.
    fn authorize_url(&self, state: &str) -> String;

    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = PorticoResult<ProviderToken>> + Send;

    fn fetch_profile(
        &self,
        access_token: &str,
    ) -> impl Future<Output = PorticoResult<ProviderProfile>> + Send;
}

/// OAuth2 client settings for one environment.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub profile_endpoint: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            tenant: "common".into(),
            redirect_uri: String::new(),
            scopes: vec!["openid".into(), "profile".into(), "email".into(), "User.Read".into()],
            authorize_endpoint: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                .into(),
            token_endpoint: "https://login.microsoftonline.com/common/oauth2/v2.0/token".into(),
            profile_endpoint: "https://graph.microsoft.com/v1.0/me".into(),
        }
    }
}

/// [`IdentityProvider`] over real HTTP, shaped for Microsoft's
/// authorization-code endpoints and Graph profile fields.
pub struct HttpIdentityProvider {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl IdentityProvider for HttpIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&state={}",
            self.config.authorize_endpoint,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> PorticoResult<ProviderToken> {
        let resp = self
            .client
            .post(&self.config.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_uri),
                ("scope", &self.config.scopes.join(" ")),
            ])
            .send()
            .await
            .map_err(|e| PorticoError::ProviderExchange(format!("token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PorticoError::ProviderExchange(format!(
                "token exchange returned {status}: {body}"
            )));
        }

        let token_json: Value = resp.json().await.map_err(|e| {
            PorticoError::ProviderExchange(format!("token response parse failed: {e}"))
        })?;

        let access_token = token_json["access_token"]
            .as_str()
            .ok_or_else(|| {
                PorticoError::ProviderExchange("missing access_token in response".into())
            })?
            .to_string();

        Ok(ProviderToken { access_token })
    }

    async fn fetch_profile(&self, access_token: &str) -> PorticoResult<ProviderProfile> {
        let resp = self
            .client
            .get(&self.config.profile_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PorticoError::ProviderExchange(format!("profile fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PorticoError::ProviderExchange(format!(
                "profile fetch returned {status}: {body}"
            )));
        }

        let profile: Value = resp.json().await.map_err(|e| {
            PorticoError::ProviderExchange(format!("profile parse failed: {e}"))
        })?;

        // Graph exposes the address as `mail` for mailbox users and
        // `userPrincipalName` otherwise.
        let email = profile["mail"]
            .as_str()
            .or_else(|| profile["userPrincipalName"].as_str())
            .ok_or_else(|| PorticoError::ProviderExchange("profile has no email".into()))?
            .to_string();

        Ok(ProviderProfile {
            email,
            first_name: profile["givenName"].as_str().unwrap_or_default().to_string(),
            last_name: profile["surname"].as_str().unwrap_or_default().to_string(),
            display_name: profile["displayName"].as_str().unwrap_or_default().to_string(),
            phone: profile["mobilePhone"].as_str().map(|s| s.to_string()),
        })
    }
}
