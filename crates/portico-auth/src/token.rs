//! Signed session token issuance and verification.
//!
//! One process-wide HMAC-SHA256 secret, loaded once at startup.
//! Verification returns a `Result` — translating failures into HTTP
//! status codes is the transport layer's concern, never this
//! module's.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Claim set carried by every access and refresh token.
///
/// Exactly one of `domain` (single portal scope: SSO and refresh
/// tokens) or `allowed_domains` (portal set: local-login access
/// tokens) is present. The asymmetry is deliberate — the session
/// guard checks intersection over `allowed_domains` while the refresh
/// flow checks exact equality on `domain` — and must be preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — user id (UUID string).
    pub sub: String,
    /// Login email.
    pub username: String,
    /// Issued-at (Unix timestamp). Stamped by [`TokenCodec::issue`].
    #[serde(default)]
    pub iat: i64,
    /// Expiration (Unix timestamp). Stamped by [`TokenCodec::issue`].
    #[serde(default)]
    pub exp: i64,
    /// Single portal scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Multi-portal scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
    /// `"local"` or `"microsoft"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<String>,
    /// Tenant scope, local auth only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
}

impl Claims {
    /// Claims in the multi-portal shape used by local-login access
    /// tokens.
    pub fn multi_portal(
        sub: impl Into<String>,
        username: impl Into<String>,
        portals: Vec<String>,
        entity_id: Option<i64>,
    ) -> Self {
        Self {
            sub: sub.into(),
            username: username.into(),
            iat: 0,
            exp: 0,
            domain: None,
            allowed_domains: Some(portals),
            auth_provider: Some("local".into()),
            entity_id,
        }
    }

    /// Whether this token's scope covers `portal`, in either shape.
    pub fn permits(&self, portal: &str) -> bool {
        match (&self.allowed_domains, &self.domain) {
            (Some(allowed), _) => allowed.iter().any(|d| d == portal),
            (None, Some(domain)) => domain == portal,
            (None, None) => false,
        }
    }

    /// Claims in the single-portal shape used by SSO access tokens
    /// and every refresh token.
    pub fn single_portal(
        sub: impl Into<String>,
        username: impl Into<String>,
        portal: impl Into<String>,
        auth_provider: Option<String>,
    ) -> Self {
        Self {
            sub: sub.into(),
            username: username.into(),
            iat: 0,
            exp: 0,
            domain: Some(portal.into()),
            allowed_domains: None,
            auth_provider,
            entity_id: None,
        }
    }
}

/// Encodes, decodes, and verifies signed session tokens.
///
/// Pure function of the secret and its input — safe to share across
/// request tasks.
pub struct TokenCodec {
    enc: EncodingKey,
    dec: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret.as_bytes()),
            dec: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Serialize `claims` with `iat = now`, `exp = now + ttl`, and
    /// sign.
    pub fn issue(&self, mut claims: Claims, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        claims.iat = now;
        claims.exp = now + ttl.num_seconds();

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.enc)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Check signature and expiry; return decoded claims. Malformed,
    /// expired, and badly signed tokens are all errors — callers pick
    /// between graceful fallback and hard 401 at their own layer.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        jsonwebtoken::decode::<Claims>(token, &self.dec, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }

    /// Sign an arbitrary claim struct with the shared secret. Used
    /// for the SSO CSRF state and password-reset tokens, which carry
    /// their own shapes.
    pub fn issue_custom<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.enc)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Verify and decode an arbitrary claim struct. Only `exp` is
    /// required beyond the signature.
    pub fn verify_custom<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<T>(token, &self.dec, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret-please-rotate")
    }

    #[test]
    fn roundtrip_multi_portal() {
        let claims = Claims::multi_portal("user-1", "a@x.com", vec!["vendor".into()], Some(7));
        let token = codec().issue(claims, Duration::seconds(60)).unwrap();
        let decoded = codec().verify(&token).unwrap();

        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.username, "a@x.com");
        assert_eq!(decoded.allowed_domains, Some(vec!["vendor".to_string()]));
        assert_eq!(decoded.domain, None);
        assert_eq!(decoded.entity_id, Some(7));
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn roundtrip_single_portal() {
        let claims = Claims::single_portal("user-2", "b@x.com", "vms", Some("microsoft".into()));
        let token = codec().issue(claims, Duration::seconds(60)).unwrap();
        let decoded = codec().verify(&token).unwrap();

        assert_eq!(decoded.domain, Some("vms".to_string()));
        assert_eq!(decoded.allowed_domains, None);
        assert_eq!(decoded.auth_provider, Some("microsoft".to_string()));
    }

    #[test]
    fn permits_respects_both_shapes() {
        let local = Claims::multi_portal("u", "u@x.com", vec!["vendor".into()], None);
        assert!(local.permits("vendor"));
        assert!(!local.permits("vms"));

        let sso = Claims::single_portal("u", "u@x.com", "vms", None);
        assert!(sso.permits("vms"));
        assert!(!sso.permits("ams"));
    }

    #[test]
    fn expired_token_fails() {
        let claims = Claims::single_portal("u", "u@x.com", "vendor", None);
        let token = codec().issue(claims, Duration::seconds(-1)).unwrap();
        assert!(matches!(
            codec().verify(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_signature_fails() {
        let claims = Claims::single_portal("u", "u@x.com", "vendor", None);
        let token = codec()
            .issue(claims, Duration::seconds(60))
            .unwrap();

        // Flip one byte in the signature segment.
        let sig_start = token.rfind('.').unwrap() + 1;
        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            if tampered == token {
                continue;
            }
            assert!(
                codec().verify(&tampered).is_err(),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let claims = Claims::single_portal("u", "u@x.com", "vendor", None);
        let token = codec().issue(claims, Duration::seconds(60)).unwrap();
        let other = TokenCodec::new("a-different-secret");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_invalid_not_a_panic() {
        assert!(matches!(
            codec().verify("not.a.jwt"),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
