//! User-module grant — the persisted authorization record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted record that a user may use a given module at a given
/// role. Created as a side effect of access-request approval; removed
/// on revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModuleGrant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub module_id: u32,
    pub user_role_id: u32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGrant {
    pub user_id: Uuid,
    pub email: String,
    pub module_id: u32,
    pub user_role_id: u32,
}
