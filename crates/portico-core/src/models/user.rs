//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The upstream source of an authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Microsoft,
}

impl AuthProvider {
    /// Stable string form used inside token claims.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Microsoft => "microsoft",
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "microsoft" => Ok(AuthProvider::Microsoft),
            other => Err(format!("unknown auth provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    /// Tenant scope. SSO-provisioned accounts use the default entity.
    pub entity_id: i64,
    pub username: String,
    pub email: String,
    /// Argon2id PHC-format hash. SSO accounts carry a random hash
    /// that is never transmitted.
    pub password_hash: String,
    pub status: UserStatus,
    pub auth_provider: AuthProvider,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub entity_id: i64,
    pub username: String,
    pub email: String,
    /// Already-hashed credential. Hashing is the caller's concern so
    /// the store contract stays crypto-free.
    pub password_hash: String,
    pub auth_provider: AuthProvider,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Everything created when an SSO login resolves to no local account:
/// a contact row, a user row, and a baseline module grant. The store
/// must apply all three or none.
#[derive(Debug, Clone)]
pub struct ProvisionSsoUser {
    pub user: CreateUser,
    /// Module the baseline grant points at.
    pub default_module_id: u32,
    /// Baseline employee role for the grant.
    pub default_role_id: u32,
}
