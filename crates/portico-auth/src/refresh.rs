//! Refresh flow — exchange a valid refresh token for a new
//! short-lived access token.

use std::sync::Arc;

use chrono::Duration;
use portico_core::error::PorticoResult;
use portico_core::models::portal::PortalRegistry;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token::{Claims, TokenCodec};

/// A freshly minted access token.
#[derive(Debug)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

pub struct RefreshFlow {
    codec: Arc<TokenCodec>,
    registry: PortalRegistry,
    config: AuthConfig,
}

impl RefreshFlow {
    pub fn new(codec: Arc<TokenCodec>, registry: PortalRegistry, config: AuthConfig) -> Self {
        Self {
            codec,
            registry,
            config,
        }
    }

    /// Verify the refresh token and mint a new access token scoped to
    /// the same single portal.
    ///
    /// Refresh tokens are always single-portal: the check is exact
    /// equality on `domain`, never intersection. The refresh token
    /// itself is not rotated.
    pub fn refresh(&self, refresh_token: &str, portal: &str) -> PorticoResult<IssuedToken> {
        self.registry.get(portal)?;

        let claims = self.codec.verify(refresh_token)?;

        let domain = claims
            .domain
            .as_deref()
            .ok_or_else(|| AuthError::TokenInvalid("token carries no domain".to_string()))?;
        if domain != portal {
            return Err(AuthError::PortalMismatch("token does not match portal".into()).into());
        }

        let fresh = Claims::single_portal(
            claims.sub,
            claims.username,
            domain.to_string(),
            claims.auth_provider,
        );
        let access_token = self.codec.issue(
            fresh,
            Duration::seconds(self.config.refreshed_access_ttl_secs as i64),
        )?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.config.refreshed_access_ttl_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::error::PorticoError;

    fn flow() -> RefreshFlow {
        let codec = Arc::new(TokenCodec::new("refresh-secret"));
        RefreshFlow::new(codec, PortalRegistry::default(), AuthConfig::default())
    }

    fn refresh_token(portal: &str) -> String {
        TokenCodec::new("refresh-secret")
            .issue(
                Claims::single_portal("u-1", "u@x.com", portal, Some("local".into())),
                Duration::days(7),
            )
            .unwrap()
    }

    #[test]
    fn matching_portal_issues_fresh_access_token() {
        let flow = flow();
        let refresh = refresh_token("vms");

        let issued = flow.refresh(&refresh, "vms").unwrap();
        assert_eq!(issued.expires_in, 900);

        let codec = TokenCodec::new("refresh-secret");
        let refresh_claims = codec.verify(&refresh).unwrap();
        let access_claims = codec.verify(&issued.access_token).unwrap();
        assert_eq!(access_claims.sub, "u-1");
        assert_eq!(access_claims.domain, Some("vms".to_string()));
        assert!(access_claims.exp > refresh_claims.iat);
    }

    #[test]
    fn portal_mismatch_rejected() {
        let err = flow().refresh(&refresh_token("vms"), "ams").unwrap_err();
        assert!(matches!(err, PorticoError::PortalMismatch { .. }));
    }

    #[test]
    fn unknown_portal_rejected() {
        let err = flow().refresh(&refresh_token("vms"), "intranet").unwrap_err();
        assert!(matches!(err, PorticoError::UnknownPortal { .. }));
    }

    #[test]
    fn multi_portal_token_is_not_a_refresh_token() {
        let token = TokenCodec::new("refresh-secret")
            .issue(
                Claims::multi_portal("u-1", "u@x.com", vec!["vms".into()], None),
                Duration::days(7),
            )
            .unwrap();
        let err = flow().refresh(&token, "vms").unwrap_err();
        assert!(matches!(err, PorticoError::InvalidCredential));
    }

    #[test]
    fn expired_refresh_token_rejected() {
        let token = TokenCodec::new("refresh-secret")
            .issue(
                Claims::single_portal("u-1", "u@x.com", "vms", None),
                Duration::seconds(-1),
            )
            .unwrap();
        let err = flow().refresh(&token, "vms").unwrap_err();
        assert!(matches!(err, PorticoError::ExpiredToken));
    }
}
