//! Error types for the Portico system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PorticoError {
    /// No token / username / password was supplied at all.
    #[error("missing credential")]
    MissingCredential,

    /// Bad password or unverifiable token. Deliberately not
    /// distinguished from [`PorticoError::MissingCredential`] in
    /// user-facing messages to avoid account enumeration.
    #[error("invalid credential")]
    InvalidCredential,

    #[error("token has expired")]
    ExpiredToken,

    /// Token `domain` / `allowed_domains` check failed.
    #[error("portal mismatch: {reason}")]
    PortalMismatch { reason: String },

    /// Portal is not in the configured enumerable set.
    #[error("unknown portal: {portal}")]
    UnknownPortal { portal: String },

    /// Password login attempted against an SSO-only portal. Policy
    /// invariant: SSO is mandatory for staff portals.
    #[error("password login is not available for portal '{portal}'; use single sign-on")]
    LocalLoginDisabled { portal: String },

    /// OAuth2 code exchange or profile fetch failed.
    #[error("identity provider exchange failed: {0}")]
    ProviderExchange(String),

    /// Atomic multi-insert failed and was rolled back.
    #[error("account provisioning failed: {0}")]
    Provisioning(String),

    /// Authenticated caller lacks a privileged role for the action.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("not found: {entity} with id {id}")]
    StateNotFound { entity: String, id: String },

    /// Decision value not approve/reject, or request not pending.
    #[error("invalid transition: {reason}")]
    InvalidTransition { reason: String },

    #[error("already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("database error: {0}")]
    Database(String),

    /// Notification delivery failed. Non-fatal for state transitions.
    #[error("notification failed: {0}")]
    Notification(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PorticoResult<T> = Result<T, PorticoError>;
