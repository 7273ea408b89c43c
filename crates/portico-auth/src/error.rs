//! Authentication error types.

use portico_core::error::PorticoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no credential supplied")]
    MissingCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    /// Token portal scope does not satisfy the caller's portal.
    #[error("portal mismatch: {0}")]
    PortalMismatch(String),

    /// Password login attempted against an SSO-only portal.
    #[error("password login is not available for portal '{0}'; use single sign-on")]
    LocalLoginDisabled(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for PorticoError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => PorticoError::InvalidCredential,
            AuthError::MissingCredentials => PorticoError::MissingCredential,
            AuthError::TokenExpired => PorticoError::ExpiredToken,
            AuthError::TokenInvalid(_) => PorticoError::InvalidCredential,
            AuthError::PortalMismatch(reason) => PorticoError::PortalMismatch { reason },
            AuthError::LocalLoginDisabled(portal) => PorticoError::LocalLoginDisabled { portal },
            AuthError::Crypto(msg) => PorticoError::Internal(msg),
        }
    }
}
