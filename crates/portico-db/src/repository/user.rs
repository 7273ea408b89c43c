//! SurrealDB implementation of [`UserDirectory`].
//!
//! SSO provisioning writes the contact row, the user row, and the
//! baseline grant in one `BEGIN TRANSACTION … COMMIT TRANSACTION`
//! block; SurrealDB rolls back every statement if any of them fails.

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::user::AuthProvider;
use portico_core::models::user::{ProvisionSsoUser, UserRecord, UserStatus};
use portico_core::repository::UserDirectory;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, Deserialize)]
struct UserRow {
    entity_id: i64,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    auth_provider: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, Deserialize)]
struct UserRowWithId {
    record_id: String,
    entity_id: i64,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    auth_provider: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    match s {
        "Active" => Ok(UserStatus::Active),
        "Disabled" => Ok(UserStatus::Disabled),
        other => Err(DbError::CorruptRow(format!("unknown user status: {other}"))),
    }
}

fn parse_provider(s: &str) -> Result<AuthProvider, DbError> {
    s.parse().map_err(DbError::CorruptRow)
}

impl UserRow {
    fn into_record(self, id: Uuid) -> Result<UserRecord, DbError> {
        Ok(UserRecord {
            id,
            entity_id: self.entity_id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            status: parse_status(&self.status)?,
            auth_provider: parse_provider(&self.auth_provider)?,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_record(self) -> Result<UserRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::CorruptRow(format!("invalid UUID: {e}")))?;
        Ok(UserRecord {
            id,
            entity_id: self.entity_id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            status: parse_status(&self.status)?,
            auth_provider: parse_provider(&self.auth_provider)?,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the user directory.
#[derive(Clone)]
pub struct SurrealUserDirectory<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserDirectory<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserDirectory for SurrealUserDirectory<C> {
    async fn find_active_by_login(
        &self,
        entity_id: i64,
        login: &str,
    ) -> PorticoResult<Option<UserRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE entity_id = $entity_id AND status = 'Active' \
                 AND (username = $login OR email = $login)",
            )
            .bind(("entity_id", entity_id))
            .bind(("login", login.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_record())
            .transpose()
            .map_err(Into::into)
    }

    async fn find_by_email(&self, email: &str) -> PorticoResult<Option<UserRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE email = $email",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_record())
            .transpose()
            .map_err(Into::into)
    }

    async fn provision_sso_user(&self, input: ProvisionSsoUser) -> PorticoResult<UserRecord> {
        let user_id = Uuid::new_v4();
        let user_id_str = user_id.to_string();
        let contact_id_str = Uuid::new_v4().to_string();
        let grant_id_str = Uuid::new_v4().to_string();
        let user = input.user;

        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::thing('contact', $contact_id) SET \
                 email = $email, first_name = $first_name, \
                 last_name = $last_name, phone = $phone; \
                 CREATE type::thing('user', $user_id) SET \
                 entity_id = $entity_id, username = $username, \
                 email = $email, password_hash = $password_hash, \
                 status = 'Active', auth_provider = $auth_provider, \
                 first_name = $first_name, last_name = $last_name, \
                 phone = $phone; \
                 CREATE type::thing('user_module_grant', $grant_id) SET \
                 user_id = $user_id, email = $email, \
                 module_id = $module_id, user_role_id = $role_id, \
                 enabled = true; \
                 COMMIT TRANSACTION;",
            )
            .bind(("contact_id", contact_id_str))
            .bind(("user_id", user_id_str.clone()))
            .bind(("grant_id", grant_id_str))
            .bind(("entity_id", user.entity_id))
            .bind(("username", user.username))
            .bind(("email", user.email))
            .bind(("password_hash", user.password_hash))
            .bind(("auth_provider", user.auth_provider.as_str().to_string()))
            .bind(("first_name", user.first_name))
            .bind(("last_name", user.last_name))
            .bind(("phone", user.phone))
            .bind(("module_id", input.default_module_id))
            .bind(("role_id", input.default_role_id))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        let mut result = self
            .db
            .query("SELECT * FROM type::thing('user', $id)")
            .bind(("id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: user_id_str,
        })?;

        Ok(row.into_record(user_id)?)
    }
}
