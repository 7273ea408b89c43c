//! SurrealDB implementation of [`GrantRepository`].

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::grant::{CreateGrant, UserModuleGrant};
use portico_core::repository::GrantRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct GrantRowWithId {
    record_id: String,
    user_id: String,
    email: String,
    module_id: u32,
    user_role_id: u32,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<UserModuleGrant, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::CorruptRow(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::CorruptRow(format!("invalid user UUID: {e}")))?;
        Ok(UserModuleGrant {
            id,
            user_id,
            email: self.email,
            module_id: self.module_id,
            user_role_id: self.user_role_id,
            enabled: self.enabled,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the grant repository.
#[derive(Clone)]
pub struct SurrealGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GrantRepository for SurrealGrantRepository<C> {
    async fn find(&self, email: &str, module_id: u32) -> PorticoResult<Option<UserModuleGrant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_module_grant \
                 WHERE email = $email AND module_id = $module_id",
            )
            .bind(("email", email.to_string()))
            .bind(("module_id", module_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_grant())
            .transpose()
            .map_err(Into::into)
    }

    async fn has_role_in(&self, email: &str, module_id: u32, roles: &[u32]) -> PorticoResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user_module_grant \
                 WHERE email = $email AND module_id = $module_id \
                 AND enabled = true AND user_role_id IN $roles \
                 GROUP ALL",
            )
            .bind(("email", email.to_string()))
            .bind(("module_id", module_id))
            .bind(("roles", roles.to_vec()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn insert(&self, input: CreateGrant) -> PorticoResult<UserModuleGrant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::thing('user_module_grant', $id) SET \
                 user_id = $user_id, email = $email, \
                 module_id = $module_id, user_role_id = $user_role_id, \
                 enabled = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("email", input.email))
            .bind(("module_id", input.module_id))
            .bind(("user_role_id", input.user_role_id))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        self.find_by_id(&id_str).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "user_module_grant".into(),
                id: id_str,
            }
            .into()
        })
    }
}

impl<C: Connection> SurrealGrantRepository<C> {
    async fn find_by_id(&self, id: &str) -> PorticoResult<Option<UserModuleGrant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM \
                 type::thing('user_module_grant', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_grant())
            .transpose()
            .map_err(Into::into)
    }
}
