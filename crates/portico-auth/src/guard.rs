//! Session guard — request-level token checks.
//!
//! Both claim shapes are session credentials: multi-portal tokens
//! (password login) must have a non-empty intersection between
//! `allowed_domains` and the configured portal set, while
//! single-portal tokens (SSO) must carry a configured portal in
//! `domain`. Exact-match-per-portal checks belong to the refresh
//! flow, not here.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::AuthError;
use crate::token::{Claims, TokenCodec};

/// Stateless per-request authenticator. Purely a function of the
/// codec secret and the configured portal set; holds no mutable
/// state.
#[derive(Clone)]
pub struct SessionGuard {
    codec: Arc<TokenCodec>,
    portals: HashSet<String>,
}

impl SessionGuard {
    pub fn new(codec: Arc<TokenCodec>, portals: impl IntoIterator<Item = String>) -> Self {
        Self {
            codec,
            portals: portals.into_iter().collect(),
        }
    }

    /// Authenticate a request given its token sources. The cookie
    /// wins over the bearer header when both are present.
    ///
    /// Tokens carrying neither `allowed_domains` nor `domain` are
    /// rejected even when otherwise valid.
    pub fn authenticate(
        &self,
        cookie_token: Option<&str>,
        bearer_token: Option<&str>,
    ) -> Result<Claims, AuthError> {
        let token = cookie_token
            .or(bearer_token)
            .ok_or(AuthError::MissingCredentials)?;

        let claims = self.codec.verify(token)?;

        match (&claims.allowed_domains, &claims.domain) {
            (Some(allowed), _) => {
                if !allowed.iter().any(|d| self.portals.contains(d)) {
                    return Err(AuthError::PortalMismatch("invalid portal in token".into()));
                }
            }
            (None, Some(domain)) => {
                if !self.portals.contains(domain) {
                    return Err(AuthError::PortalMismatch("invalid portal in token".into()));
                }
            }
            (None, None) => {
                return Err(AuthError::TokenInvalid("token carries no portal scope".into()));
            }
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn guard() -> SessionGuard {
        let codec = Arc::new(TokenCodec::new("guard-secret"));
        SessionGuard::new(codec.clone(), ["vendor".to_string(), "vms".to_string()])
    }

    fn issue(claims: Claims) -> String {
        TokenCodec::new("guard-secret")
            .issue(claims, Duration::seconds(60))
            .unwrap()
    }

    #[test]
    fn missing_token_rejected() {
        assert!(matches!(
            guard().authenticate(None, None),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let good = issue(Claims::multi_portal("u", "u@x.com", vec!["vendor".into()], None));
        let claims = guard()
            .authenticate(Some(&good), Some("garbage"))
            .unwrap();
        assert_eq!(claims.sub, "u");
    }

    #[test]
    fn bearer_fallback_works() {
        let good = issue(Claims::multi_portal("u", "u@x.com", vec!["vms".into()], None));
        assert!(guard().authenticate(None, Some(&good)).is_ok());
    }

    #[test]
    fn vendor_token_accepted_admin_only_token_rejected() {
        let vendor = issue(Claims::multi_portal("u", "u@x.com", vec!["vendor".into()], None));
        assert!(guard().authenticate(Some(&vendor), None).is_ok());

        let admin = issue(Claims::multi_portal("u", "u@x.com", vec!["admin".into()], None));
        assert!(matches!(
            guard().authenticate(Some(&admin), None),
            Err(AuthError::PortalMismatch(_))
        ));
    }

    #[test]
    fn single_portal_token_accepted_for_configured_portal() {
        let sso = issue(Claims::single_portal("u", "u@x.com", "vms", None));
        let claims = guard().authenticate(Some(&sso), None).unwrap();
        assert_eq!(claims.domain.as_deref(), Some("vms"));
    }

    #[test]
    fn single_portal_token_for_unknown_portal_rejected() {
        let foreign = issue(Claims::single_portal("u", "u@x.com", "intranet", None));
        assert!(matches!(
            guard().authenticate(Some(&foreign), None),
            Err(AuthError::PortalMismatch(_))
        ));
    }

    #[test]
    fn token_without_portal_scope_rejected() {
        let mut claims = Claims::single_portal("u", "u@x.com", "vms", None);
        claims.domain = None;
        let bare = issue(claims);
        assert!(matches!(
            guard().authenticate(Some(&bare), None),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
