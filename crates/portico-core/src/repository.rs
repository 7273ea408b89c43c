//! Store trait definitions — the narrow contract Portico consumes
//! from the credential store.
//!
//! All operations are async. Multi-row mutations
//! ([`UserDirectory::provision_sso_user`],
//! [`AccessRequestRepository::approve_with_grant`],
//! [`AccessRequestRepository::revoke_and_reset`]) must be applied
//! atomically by the implementation: all rows committed or none.

use uuid::Uuid;

use crate::error::PorticoResult;
use crate::models::{
    access_request::{AccessRequest, Approver, CreateAccessRequest},
    grant::{CreateGrant, UserModuleGrant},
    user::{ProvisionSsoUser, UserRecord},
};

/// Filter for listing access requests.
#[derive(Debug, Clone, Default)]
pub struct AccessRequestFilter {
    pub email: Option<String>,
    pub module_id: Option<u32>,
    pub status_code: Option<u8>,
}

/// User lookups and SSO provisioning.
pub trait UserDirectory: Send + Sync {
    /// Find an active user scoped to an entity whose username OR
    /// email matches `login`.
    fn find_active_by_login(
        &self,
        entity_id: i64,
        login: &str,
    ) -> impl Future<Output = PorticoResult<Option<UserRecord>>> + Send;

    /// Find a user by email across entities (SSO resolution and
    /// password reset).
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = PorticoResult<Option<UserRecord>>> + Send;

    /// Create contact + user + baseline grant in one transaction.
    /// A partial failure must leave no rows behind.
    fn provision_sso_user(
        &self,
        input: ProvisionSsoUser,
    ) -> impl Future<Output = PorticoResult<UserRecord>> + Send;
}

/// Grant rows — the records `check_access` consults.
pub trait GrantRepository: Send + Sync {
    fn find(
        &self,
        email: &str,
        module_id: u32,
    ) -> impl Future<Output = PorticoResult<Option<UserModuleGrant>>> + Send;

    /// True iff an enabled grant exists for `(email, module_id)` with
    /// a role in `roles`.
    fn has_role_in(
        &self,
        email: &str,
        module_id: u32,
        roles: &[u32],
    ) -> impl Future<Output = PorticoResult<bool>> + Send;

    fn insert(
        &self,
        input: CreateGrant,
    ) -> impl Future<Output = PorticoResult<UserModuleGrant>> + Send;
}

/// Access request rows and their transactional transitions.
pub trait AccessRequestRepository: Send + Sync {
    fn get(&self, id: Uuid) -> impl Future<Output = PorticoResult<Option<AccessRequest>>> + Send;

    /// Find an existing pending or approved request for
    /// `(email, module_id)` — the duplicate-filing precondition.
    fn find_open(
        &self,
        email: &str,
        module_id: u32,
    ) -> impl Future<Output = PorticoResult<Option<AccessRequest>>> + Send;

    fn insert(
        &self,
        input: CreateAccessRequest,
    ) -> impl Future<Output = PorticoResult<AccessRequest>> + Send;

    fn list(
        &self,
        filter: AccessRequestFilter,
    ) -> impl Future<Output = PorticoResult<Vec<AccessRequest>>> + Send;

    /// Mark approved and insert the grant row in one transaction.
    /// A request observable as approved without its grant is an
    /// inconsistent state the store must prevent.
    fn approve_with_grant(
        &self,
        id: Uuid,
        approver: Approver,
        grant: CreateGrant,
    ) -> impl Future<Output = PorticoResult<AccessRequest>> + Send;

    fn reject(
        &self,
        id: Uuid,
        approver: Approver,
    ) -> impl Future<Output = PorticoResult<AccessRequest>> + Send;

    /// Delete the grant and reset any associated request back to
    /// pending with no approver, in one transaction. Access removed;
    /// the user may re-request.
    fn revoke_and_reset(
        &self,
        email: &str,
        module_id: u32,
    ) -> impl Future<Output = PorticoResult<()>> + Send;
}
