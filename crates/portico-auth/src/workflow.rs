//! Access-request workflow — filing, decision, access checks and
//! revocation.
//!
//! A request is pending until an approver decides it, and a decision
//! is final: the only transitions are pending to approved and pending
//! to rejected. Approval and its grant row are written together;
//! notification mail is sent after commit and never rolls anything
//! back.

use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::access_request::{
    AccessRequest, Approver, CreateAccessRequest, RequestStatus,
};
use portico_core::models::grant::CreateGrant;
use portico_core::models::portal::PortalRegistry;
use portico_core::notify::{Mailer, TemplatedEmail};
use portico_core::repository::{
    AccessRequestFilter, AccessRequestRepository, GrantRepository, UserDirectory,
};
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;

/// Approver verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Parse the wire value. Anything but the two known verdicts is
    /// rejected before any row is touched.
    pub fn parse(value: &str) -> PorticoResult<Self> {
        match value {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject),
            other => Err(PorticoError::InvalidTransition {
                reason: format!("unknown decision '{other}'"),
            }),
        }
    }
}

/// Input for filing a new access request.
#[derive(Debug, Clone)]
pub struct FileRequestInput {
    pub email: String,
    pub contact_id: Option<Uuid>,
    pub module_id: u32,
    /// Display name used in the admin notification.
    pub requester_name: String,
}

pub struct AccessRequestWorkflow<R, G, U, M>
where
    R: AccessRequestRepository,
    G: GrantRepository,
    U: UserDirectory,
    M: Mailer,
{
    requests: R,
    grants: G,
    users: U,
    mailer: M,
    registry: PortalRegistry,
    config: AuthConfig,
}

impl<R, G, U, M> AccessRequestWorkflow<R, G, U, M>
where
    R: AccessRequestRepository,
    G: GrantRepository,
    U: UserDirectory,
    M: Mailer,
{
    pub fn new(
        requests: R,
        grants: G,
        users: U,
        mailer: M,
        registry: PortalRegistry,
        config: AuthConfig,
    ) -> Self {
        Self {
            requests,
            grants,
            users,
            mailer,
            registry,
            config,
        }
    }

    /// File a request for module access. At most one open (pending or
    /// approved) request may exist per `(email, module)`.
    pub async fn file_request(&self, input: FileRequestInput) -> PorticoResult<AccessRequest> {
        let portal = self.registry.get_by_module(input.module_id)?;

        if let Some(open) = self
            .requests
            .find_open(&input.email, input.module_id)
            .await?
        {
            return Err(PorticoError::AlreadyExists {
                entity: format!(
                    "access request for {} / module {} (status {})",
                    open.email,
                    open.requested_module,
                    open.status.code()
                ),
            });
        }

        let request = self
            .requests
            .insert(CreateAccessRequest {
                email: input.email.clone(),
                contact_id: input.contact_id,
                requested_module: input.module_id,
            })
            .await?;

        self.notify_admins(&request, &input.requester_name, &portal.name)
            .await;

        Ok(request)
    }

    pub async fn get(&self, id: Uuid) -> PorticoResult<AccessRequest> {
        self.requests
            .get(id)
            .await?
            .ok_or_else(|| PorticoError::StateNotFound {
                entity: "access request".into(),
                id: id.to_string(),
            })
    }

    pub async fn list(&self, filter: AccessRequestFilter) -> PorticoResult<Vec<AccessRequest>> {
        self.requests.list(filter).await
    }

    /// Apply an approver's verdict to a pending request.
    ///
    /// The approver must themselves hold a privileged role on the
    /// requested module. Approval resolves the requester's account and
    /// writes the approved status and the grant row in one
    /// transaction; `granted_role_id` picks the role from the portal's
    /// privileged set, defaulting to the first one. The requester is
    /// mailed afterwards; delivery failure does not undo the decision.
    pub async fn decide(
        &self,
        id: Uuid,
        decision: Decision,
        approver: Approver,
        granted_role_id: Option<u32>,
    ) -> PorticoResult<AccessRequest> {
        let request = self.get(id).await?;

        if request.status.is_terminal() {
            return Err(PorticoError::InvalidTransition {
                reason: format!(
                    "request {id} already decided (status {})",
                    request.status.code()
                ),
            });
        }

        let portal = self.registry.get_by_module(request.requested_module)?;

        let authorized = self
            .grants
            .has_role_in(
                &approver.email,
                request.requested_module,
                &portal.privileged_roles,
            )
            .await?;
        if !authorized {
            return Err(PorticoError::AccessDenied {
                reason: format!(
                    "{} holds no privileged role for portal '{}'",
                    approver.email, portal.name
                ),
            });
        }

        let decided = match decision {
            Decision::Approve => {
                let role_id = match granted_role_id {
                    Some(role) if portal.privileged_roles.contains(&role) => role,
                    Some(role) => {
                        return Err(PorticoError::InvalidTransition {
                            reason: format!(
                                "role {role} is not grantable on portal '{}'",
                                portal.name
                            ),
                        });
                    }
                    None => portal.privileged_roles.first().copied().ok_or_else(|| {
                        PorticoError::Internal(format!("portal '{}' has no roles", portal.name))
                    })?,
                };

                let user = self
                    .users
                    .find_by_email(&request.email)
                    .await?
                    .ok_or_else(|| PorticoError::StateNotFound {
                        entity: "user".into(),
                        id: request.email.clone(),
                    })?;

                self.requests
                    .approve_with_grant(
                        id,
                        approver,
                        CreateGrant {
                            user_id: user.id,
                            email: request.email.clone(),
                            module_id: request.requested_module,
                            user_role_id: role_id,
                        },
                    )
                    .await?
            }
            Decision::Reject => self.requests.reject(id, approver).await?,
        };

        self.notify_requester(&decided).await;

        Ok(decided)
    }

    /// True iff `email` holds an enabled grant with a privileged role
    /// for the portal.
    pub async fn check_access(&self, email: &str, portal: &str) -> PorticoResult<bool> {
        let portal = self.registry.get(portal)?;
        self.grants
            .has_role_in(email, portal.module_id, &portal.privileged_roles)
            .await
    }

    /// Remove the grant and reset any associated request to pending.
    /// The user loses access immediately and may file again.
    pub async fn revoke(&self, email: &str, module_id: u32) -> PorticoResult<()> {
        self.registry.get_by_module(module_id)?;
        self.requests.revoke_and_reset(email, module_id).await
    }

    async fn notify_admins(&self, request: &AccessRequest, requester_name: &str, portal: &str) {
        if self.config.module_admin_recipients.is_empty() {
            return;
        }

        let email = TemplatedEmail {
            subject: format!("Access request for {portal}"),
            greeting: "Hello,".into(),
            recipient_name: "Module administrator".into(),
            key_values: vec![
                ("Requester".into(), requester_name.to_string()),
                ("Email".into(), request.email.clone()),
                ("Portal".into(), portal.to_string()),
                (
                    "Review".into(),
                    format!("{}/{}", self.config.approval_link_base, request.id),
                ),
            ],
            to: self.config.module_admin_recipients.clone(),
            cc: Vec::new(),
            bcc: Vec::new(),
        };

        if let Err(e) = self.mailer.send_templated(&email).await {
            warn!(request_id = %request.id, error = %e, "admin notification failed");
        }
    }

    async fn notify_requester(&self, request: &AccessRequest) {
        let verdict = match request.status {
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Pending => return,
        };

        let email = TemplatedEmail {
            subject: format!("Your access request was {verdict}"),
            greeting: "Hello,".into(),
            recipient_name: request.email.clone(),
            key_values: vec![
                ("Request".into(), request.id.to_string()),
                ("Outcome".into(), verdict.to_string()),
            ],
            to: vec![request.email.clone()],
            cc: Vec::new(),
            bcc: Vec::new(),
        };

        if let Err(e) = self.mailer.send_templated(&email).await {
            warn!(request_id = %request.id, error = %e, "requester notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use portico_core::models::grant::UserModuleGrant;
    use portico_core::models::user::AuthProvider;
    use portico_core::models::user::{ProvisionSsoUser, UserRecord, UserStatus};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore {
        requests: Mutex<Vec<AccessRequest>>,
        grants: Mutex<Vec<UserModuleGrant>>,
        users: Mutex<Vec<UserRecord>>,
    }

    impl AccessRequestRepository for &MemStore {
        async fn get(&self, id: Uuid) -> PorticoResult<Option<AccessRequest>> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn find_open(&self, email: &str, module_id: u32) -> PorticoResult<Option<AccessRequest>> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.email == email
                        && r.requested_module == module_id
                        && r.status != RequestStatus::Rejected
                })
                .cloned())
        }

        async fn insert(&self, input: CreateAccessRequest) -> PorticoResult<AccessRequest> {
            let now = Utc::now();
            let request = AccessRequest {
                id: Uuid::new_v4(),
                email: input.email,
                contact_id: input.contact_id,
                requested_module: input.requested_module,
                status: RequestStatus::Pending,
                approver_id: None,
                approver_name: None,
                approver_email: None,
                created_at: now,
                updated_at: now,
            };
            self.requests.lock().unwrap().push(request.clone());
            Ok(request)
        }

        async fn list(&self, filter: AccessRequestFilter) -> PorticoResult<Vec<AccessRequest>> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| filter.email.as_deref().is_none_or(|e| r.email == e))
                .filter(|r| filter.module_id.is_none_or(|m| r.requested_module == m))
                .filter(|r| filter.status_code.is_none_or(|s| r.status.code() == s))
                .cloned()
                .collect())
        }

        async fn approve_with_grant(
            &self,
            id: Uuid,
            approver: Approver,
            grant: CreateGrant,
        ) -> PorticoResult<AccessRequest> {
            let mut requests = self.requests.lock().unwrap();
            let request = requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| PorticoError::StateNotFound {
                    entity: "access request".into(),
                    id: id.to_string(),
                })?;
            request.status = RequestStatus::Approved;
            request.approver_id = Some(approver.id);
            request.approver_name = Some(approver.name);
            request.approver_email = Some(approver.email);
            request.updated_at = Utc::now();

            self.grants.lock().unwrap().push(UserModuleGrant {
                id: Uuid::new_v4(),
                user_id: grant.user_id,
                email: grant.email,
                module_id: grant.module_id,
                user_role_id: grant.user_role_id,
                enabled: true,
                created_at: Utc::now(),
            });

            Ok(request.clone())
        }

        async fn reject(&self, id: Uuid, approver: Approver) -> PorticoResult<AccessRequest> {
            let mut requests = self.requests.lock().unwrap();
            let request = requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| PorticoError::StateNotFound {
                    entity: "access request".into(),
                    id: id.to_string(),
                })?;
            request.status = RequestStatus::Rejected;
            request.approver_id = Some(approver.id);
            request.approver_name = Some(approver.name);
            request.approver_email = Some(approver.email);
            request.updated_at = Utc::now();
            Ok(request.clone())
        }

        async fn revoke_and_reset(&self, email: &str, module_id: u32) -> PorticoResult<()> {
            self.grants
                .lock()
                .unwrap()
                .retain(|g| !(g.email == email && g.module_id == module_id));
            for request in self.requests.lock().unwrap().iter_mut() {
                if request.email == email && request.requested_module == module_id {
                    request.status = RequestStatus::Pending;
                    request.approver_id = None;
                    request.approver_name = None;
                    request.approver_email = None;
                    request.updated_at = Utc::now();
                }
            }
            Ok(())
        }
    }

    impl GrantRepository for &MemStore {
        async fn find(&self, email: &str, module_id: u32) -> PorticoResult<Option<UserModuleGrant>> {
            Ok(self
                .grants
                .lock()
                .unwrap()
                .iter()
                .find(|g| g.email == email && g.module_id == module_id)
                .cloned())
        }

        async fn has_role_in(
            &self,
            email: &str,
            module_id: u32,
            roles: &[u32],
        ) -> PorticoResult<bool> {
            Ok(self.grants.lock().unwrap().iter().any(|g| {
                g.email == email
                    && g.module_id == module_id
                    && g.enabled
                    && roles.contains(&g.user_role_id)
            }))
        }

        async fn insert(&self, input: CreateGrant) -> PorticoResult<UserModuleGrant> {
            let grant = UserModuleGrant {
                id: Uuid::new_v4(),
                user_id: input.user_id,
                email: input.email,
                module_id: input.module_id,
                user_role_id: input.user_role_id,
                enabled: true,
                created_at: Utc::now(),
            };
            self.grants.lock().unwrap().push(grant.clone());
            Ok(grant)
        }
    }

    impl UserDirectory for &MemStore {
        async fn find_active_by_login(
            &self,
            _entity_id: i64,
            _login: &str,
        ) -> PorticoResult<Option<UserRecord>> {
            Ok(None)
        }

        async fn find_by_email(&self, email: &str) -> PorticoResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn provision_sso_user(&self, _input: ProvisionSsoUser) -> PorticoResult<UserRecord> {
            unreachable!("workflow never provisions")
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<TemplatedEmail>>,
    }

    impl Mailer for &RecordingMailer {
        async fn send_templated(&self, email: &TemplatedEmail) -> PorticoResult<()> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn seed_user(store: &MemStore, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        store.users.lock().unwrap().push(UserRecord {
            id,
            entity_id: 1,
            username: email.to_string(),
            email: email.to_string(),
            password_hash: "x".into(),
            status: UserStatus::Active,
            auth_provider: AuthProvider::Microsoft,
            first_name: "Test".into(),
            last_name: "User".into(),
            phone: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn workflow<'a>(
        store: &'a MemStore,
        mailer: &'a RecordingMailer,
    ) -> AccessRequestWorkflow<&'a MemStore, &'a MemStore, &'a MemStore, &'a RecordingMailer> {
        AccessRequestWorkflow::new(
            store,
            store,
            store,
            mailer,
            PortalRegistry::default(),
            AuthConfig {
                module_admin_recipients: vec!["admins@example.com".into()],
                ..AuthConfig::default()
            },
        )
    }

    fn approver() -> Approver {
        Approver {
            id: Uuid::new_v4(),
            name: "Ada Admin".into(),
            email: "ada@example.com".into(),
        }
    }

    /// Give the test approver a privileged role on `module_id` so the
    /// decision gate lets them through.
    fn seed_approver_grant(store: &MemStore, module_id: u32, role_id: u32) {
        store.grants.lock().unwrap().push(UserModuleGrant {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            module_id,
            user_role_id: role_id,
            enabled: true,
            created_at: Utc::now(),
        });
    }

    fn file_input(email: &str, module_id: u32) -> FileRequestInput {
        FileRequestInput {
            email: email.into(),
            contact_id: None,
            module_id,
            requester_name: "Test User".into(),
        }
    }

    #[tokio::test]
    async fn filing_creates_pending_and_notifies_admins() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.approver_id.is_none());

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["admins@example.com".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_open_request_rejected() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let wf = workflow(&store, &mailer);

        wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        let err = wf.file_request(file_input("u@x.com", 4)).await.unwrap_err();
        assert!(matches!(err, PorticoError::AlreadyExists { .. }));

        // Same email, different module is fine.
        wf.file_request(file_input("u@x.com", 3)).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_module_rejected() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let wf = workflow(&store, &mailer);

        let err = wf.file_request(file_input("u@x.com", 99)).await.unwrap_err();
        assert!(matches!(err, PorticoError::UnknownPortal { .. }));
    }

    #[tokio::test]
    async fn approval_writes_grant_and_opens_access() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let user_id = seed_user(&store, "u@x.com");
        seed_approver_grant(&store, 4, 6);
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        assert!(!wf.check_access("u@x.com", "vms").await.unwrap());

        let decided = wf
            .decide(request.id, Decision::Approve, approver(), None)
            .await
            .unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.approver_name.as_deref(), Some("Ada Admin"));

        assert!(wf.check_access("u@x.com", "vms").await.unwrap());
        // The grant is scoped to vms (module 4); ams stays closed.
        assert!(!wf.check_access("u@x.com", "ams").await.unwrap());

        let grants = store.grants.lock().unwrap();
        let granted: Vec<_> = grants.iter().filter(|g| g.email == "u@x.com").collect();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].user_id, user_id);
        assert_eq!(granted[0].user_role_id, 6);
    }

    #[tokio::test]
    async fn approval_with_explicit_role_grants_that_role() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        seed_user(&store, "u@x.com");
        seed_approver_grant(&store, 4, 6);
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        wf.decide(request.id, Decision::Approve, approver(), Some(7))
            .await
            .unwrap();

        let grants = store.grants.lock().unwrap();
        let granted: Vec<_> = grants.iter().filter(|g| g.email == "u@x.com").collect();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].user_role_id, 7);
    }

    #[tokio::test]
    async fn approval_refuses_role_outside_the_portal() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        seed_user(&store, "u@x.com");
        seed_approver_grant(&store, 4, 6);
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        // Role 9 belongs to ams, not vms.
        let err = wf
            .decide(request.id, Decision::Approve, approver(), Some(9))
            .await
            .unwrap_err();
        assert!(matches!(err, PorticoError::InvalidTransition { .. }));

        let pending = wf.get(request.id).await.unwrap();
        assert_eq!(pending.status, RequestStatus::Pending);
        assert!(!wf.check_access("u@x.com", "vms").await.unwrap());
    }

    #[tokio::test]
    async fn approver_without_privileged_role_is_denied() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        seed_user(&store, "u@x.com");
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        // No grant seeded for the approver, on either verdict.
        for decision in [Decision::Approve, Decision::Reject] {
            let err = wf
                .decide(request.id, decision, approver(), None)
                .await
                .unwrap_err();
            assert!(matches!(err, PorticoError::AccessDenied { .. }));
        }

        let pending = wf.get(request.id).await.unwrap();
        assert_eq!(pending.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn rejection_leaves_no_grant() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        seed_user(&store, "u@x.com");
        seed_approver_grant(&store, 4, 6);
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        let decided = wf
            .decide(request.id, Decision::Reject, approver(), None)
            .await
            .unwrap();
        assert_eq!(decided.status, RequestStatus::Rejected);
        assert!(
            store
                .grants
                .lock()
                .unwrap()
                .iter()
                .all(|g| g.email != "u@x.com")
        );
        assert!(!wf.check_access("u@x.com", "vms").await.unwrap());
    }

    #[tokio::test]
    async fn decisions_are_final() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        seed_user(&store, "u@x.com");
        seed_approver_grant(&store, 4, 6);
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        wf.decide(request.id, Decision::Reject, approver(), None)
            .await
            .unwrap();

        let err = wf
            .decide(request.id, Decision::Approve, approver(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PorticoError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn deciding_missing_request_is_not_found() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let wf = workflow(&store, &mailer);

        let err = wf
            .decide(Uuid::new_v4(), Decision::Approve, approver(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PorticoError::StateNotFound { .. }));
    }

    #[tokio::test]
    async fn revoke_removes_grant_and_allows_refiling() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        seed_user(&store, "u@x.com");
        seed_approver_grant(&store, 4, 6);
        let wf = workflow(&store, &mailer);

        let request = wf.file_request(file_input("u@x.com", 4)).await.unwrap();
        wf.decide(request.id, Decision::Approve, approver(), None)
            .await
            .unwrap();
        assert!(wf.check_access("u@x.com", "vms").await.unwrap());

        wf.revoke("u@x.com", 4).await.unwrap();
        assert!(!wf.check_access("u@x.com", "vms").await.unwrap());

        let reset = wf.get(request.id).await.unwrap();
        assert_eq!(reset.status, RequestStatus::Pending);
        assert!(reset.approver_id.is_none());
    }

    #[test]
    fn decision_parsing() {
        assert_eq!(Decision::parse("approve").unwrap(), Decision::Approve);
        assert_eq!(Decision::parse("reject").unwrap(), Decision::Reject);
        assert!(matches!(
            Decision::parse("maybe"),
            Err(PorticoError::InvalidTransition { .. })
        ));
    }
}
