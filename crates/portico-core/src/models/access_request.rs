//! Access request — a user's petition for module membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an access request.
///
/// Pending is the only non-terminal state; a request transitions at
/// most once out of it. The numeric codes are the store's wire values
/// and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn code(&self) -> u8 {
        match self {
            RequestStatus::Pending => 8,
            RequestStatus::Approved => 11,
            RequestStatus::Rejected => 12,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            8 => Some(RequestStatus::Pending),
            11 => Some(RequestStatus::Approved),
            12 => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub email: String,
    pub contact_id: Option<Uuid>,
    pub requested_module: u32,
    pub status: RequestStatus,
    pub approver_id: Option<Uuid>,
    pub approver_name: Option<String>,
    pub approver_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccessRequest {
    pub email: String,
    pub contact_id: Option<Uuid>,
    pub requested_module: u32,
}

/// Identity of the approver, derived from verified claims at decision
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approver {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
