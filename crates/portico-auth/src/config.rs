//! Authentication configuration.

/// Configuration for the authentication core.
///
/// The JWT secret is loaded once at startup; there is no per-token
/// key rotation.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC-SHA256 secret for every signed token.
    pub jwt_secret: String,
    /// Access token lifetime for password login, in seconds
    /// (default: 6_000 = 100 minutes).
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_ttl_secs: u64,
    /// Access token lifetime when minted by the refresh flow, in
    /// seconds (default: 900 = 15 minutes).
    pub refreshed_access_ttl_secs: u64,
    /// SSO CSRF state lifetime — the expected round-trip time of the
    /// provider redirect (default: 600 = 10 minutes).
    pub sso_state_ttl_secs: u64,
    /// Password-reset token lifetime in seconds (default: 3_600).
    pub reset_token_ttl_secs: u64,
    /// Entity SSO-provisioned accounts are attached to.
    pub default_entity_id: i64,
    /// Baseline module granted to freshly provisioned SSO accounts.
    pub default_module_id: u32,
    /// Baseline employee role for that grant.
    pub default_role_id: u32,
    /// Base URL the approval link in admin notifications points at.
    pub approval_link_base: String,
    /// Base URL password-reset links point at.
    pub reset_link_base: String,
    /// Module-admin recipients notified when a request is filed.
    pub module_admin_recipients: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_secs: 6_000,
            refresh_token_ttl_secs: 604_800,
            refreshed_access_ttl_secs: 900,
            sso_state_ttl_secs: 600,
            reset_token_ttl_secs: 3_600,
            default_entity_id: 1,
            default_module_id: 1,
            default_role_id: 5,
            approval_link_base: "https://admin.example.com/access-requests".into(),
            reset_link_base: "https://vendor.example.com/reset-password".into(),
            module_admin_recipients: Vec::new(),
        }
    }
}
