//! SurrealDB implementation of [`AccessRequestRepository`].
//!
//! The two multi-row transitions (approve+grant, revoke+reset) run as
//! single `BEGIN TRANSACTION … COMMIT TRANSACTION` blocks. Approval
//! and rejection guard on `status = 8` inside the transaction and
//! THROW when the request was decided concurrently, so a request can
//! never be observed approved without its grant or decided twice.

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::access_request::{
    AccessRequest, Approver, CreateAccessRequest, RequestStatus,
};
use portico_core::models::grant::CreateGrant;
use portico_core::repository::{AccessRequestFilter, AccessRequestRepository};
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct RequestRow {
    email: String,
    contact_id: Option<String>,
    requested_module: u32,
    status: u8,
    approver_id: Option<String>,
    approver_name: Option<String>,
    approver_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RequestRowWithId {
    record_id: String,
    email: String,
    contact_id: Option<String>,
    requested_module: u32,
    status: u8,
    approver_id: Option<String>,
    approver_name: Option<String>,
    approver_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_uuid_opt(value: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    value
        .map(|s| {
            Uuid::parse_str(&s).map_err(|e| DbError::CorruptRow(format!("invalid {what}: {e}")))
        })
        .transpose()
}

fn parse_status(code: u8) -> Result<RequestStatus, DbError> {
    RequestStatus::from_code(code)
        .ok_or_else(|| DbError::CorruptRow(format!("unknown request status code: {code}")))
}

impl RequestRow {
    fn into_request(self, id: Uuid) -> Result<AccessRequest, DbError> {
        Ok(AccessRequest {
            id,
            email: self.email,
            contact_id: parse_uuid_opt(self.contact_id, "contact UUID")?,
            requested_module: self.requested_module,
            status: parse_status(self.status)?,
            approver_id: parse_uuid_opt(self.approver_id, "approver UUID")?,
            approver_name: self.approver_name,
            approver_email: self.approver_email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RequestRowWithId {
    fn try_into_request(self) -> Result<AccessRequest, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::CorruptRow(format!("invalid UUID: {e}")))?;
        Ok(AccessRequest {
            id,
            email: self.email,
            contact_id: parse_uuid_opt(self.contact_id, "contact UUID")?,
            requested_module: self.requested_module,
            status: parse_status(self.status)?,
            approver_id: parse_uuid_opt(self.approver_id, "approver UUID")?,
            approver_name: self.approver_name,
            approver_email: self.approver_email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the access-request repository.
#[derive(Clone)]
pub struct SurrealAccessRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccessRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_row(&self, id: Uuid) -> PorticoResult<Option<AccessRequest>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::thing('access_request', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RequestRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.into_request(id))
            .transpose()
            .map_err(Into::into)
    }

    async fn require_row(&self, id: Uuid) -> PorticoResult<AccessRequest> {
        self.get_row(id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "access_request".into(),
                id: id.to_string(),
            }
            .into()
        })
    }
}

impl<C: Connection> AccessRequestRepository for SurrealAccessRequestRepository<C> {
    async fn get(&self, id: Uuid) -> PorticoResult<Option<AccessRequest>> {
        self.get_row(id).await
    }

    async fn find_open(&self, email: &str, module_id: u32) -> PorticoResult<Option<AccessRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM access_request \
                 WHERE email = $email AND requested_module = $module_id \
                 AND status IN [8, 11]",
            )
            .bind(("email", email.to_string()))
            .bind(("module_id", module_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RequestRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_request())
            .transpose()
            .map_err(Into::into)
    }

    async fn insert(&self, input: CreateAccessRequest) -> PorticoResult<AccessRequest> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::thing('access_request', $id) SET \
                 email = $email, contact_id = $contact_id, \
                 requested_module = $module_id, status = 8",
            )
            .bind(("id", id.to_string()))
            .bind(("email", input.email))
            .bind(("contact_id", input.contact_id.map(|c| c.to_string())))
            .bind(("module_id", input.requested_module))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        self.require_row(id).await
    }

    async fn list(&self, filter: AccessRequestFilter) -> PorticoResult<Vec<AccessRequest>> {
        let mut conditions = Vec::new();
        if filter.email.is_some() {
            conditions.push("email = $email");
        }
        if filter.module_id.is_some() {
            conditions.push("requested_module = $module_id");
        }
        if filter.status_code.is_some() {
            conditions.push("status = $status");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM access_request \
             {where_clause}ORDER BY created_at ASC"
        );

        let mut builder = self.db.query(&query);
        if let Some(email) = filter.email {
            builder = builder.bind(("email", email));
        }
        if let Some(module_id) = filter.module_id {
            builder = builder.bind(("module_id", module_id));
        }
        if let Some(status) = filter.status_code {
            builder = builder.bind(("status", status));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<RequestRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_request().map_err(Into::into))
            .collect()
    }

    async fn approve_with_grant(
        &self,
        id: Uuid,
        approver: Approver,
        grant: CreateGrant,
    ) -> PorticoResult<AccessRequest> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $updated = UPDATE type::thing('access_request', $id) SET \
                 status = 11, approver_id = $approver_id, \
                 approver_name = $approver_name, \
                 approver_email = $approver_email, \
                 updated_at = time::now() \
                 WHERE status = 8; \
                 IF array::len($updated) == 0 \
                 { THROW 'request is not pending' }; \
                 CREATE type::thing('user_module_grant', $grant_id) SET \
                 user_id = $user_id, email = $email, \
                 module_id = $module_id, user_role_id = $user_role_id, \
                 enabled = true; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("approver_id", approver.id.to_string()))
            .bind(("approver_name", approver.name))
            .bind(("approver_email", approver.email))
            .bind(("grant_id", Uuid::new_v4().to_string()))
            .bind(("user_id", grant.user_id.to_string()))
            .bind(("email", grant.email))
            .bind(("module_id", grant.module_id))
            .bind(("user_role_id", grant.user_role_id))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        self.require_row(id).await
    }

    async fn reject(&self, id: Uuid, approver: Approver) -> PorticoResult<AccessRequest> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $updated = UPDATE type::thing('access_request', $id) SET \
                 status = 12, approver_id = $approver_id, \
                 approver_name = $approver_name, \
                 approver_email = $approver_email, \
                 updated_at = time::now() \
                 WHERE status = 8; \
                 IF array::len($updated) == 0 \
                 { THROW 'request is not pending' }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("approver_id", approver.id.to_string()))
            .bind(("approver_name", approver.name))
            .bind(("approver_email", approver.email))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        self.require_row(id).await
    }

    async fn revoke_and_reset(&self, email: &str, module_id: u32) -> PorticoResult<()> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE user_module_grant \
                 WHERE email = $email AND module_id = $module_id; \
                 UPDATE access_request SET status = 8, \
                 approver_id = NONE, approver_name = NONE, \
                 approver_email = NONE, updated_at = time::now() \
                 WHERE email = $email AND requested_module = $module_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("email", email.to_string()))
            .bind(("module_id", module_id))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        Ok(())
    }
}
