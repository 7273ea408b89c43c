//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as their wire values
//! with ASSERT constraints for validation; access-request status uses
//! the numeric lifecycle codes.

use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, Deserialize)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Contacts (person records; users and pre-registration requesters)
-- =======================================================================
DEFINE TABLE contact SCHEMAFULL;
DEFINE FIELD email ON TABLE contact TYPE string;
DEFINE FIELD first_name ON TABLE contact TYPE string;
DEFINE FIELD last_name ON TABLE contact TYPE string;
DEFINE FIELD phone ON TABLE contact TYPE option<string>;
DEFINE FIELD created_at ON TABLE contact TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_contact_email ON TABLE contact COLUMNS email UNIQUE;

-- =======================================================================
-- Users (entity scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD entity_id ON TABLE user TYPE int;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Disabled'];
DEFINE FIELD auth_provider ON TABLE user TYPE string \
    ASSERT $value IN ['local', 'microsoft'];
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD phone ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_entity_username ON TABLE user \
    COLUMNS entity_id, username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- User-module grants (the records access checks consult)
-- =======================================================================
DEFINE TABLE user_module_grant SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_module_grant TYPE string;
DEFINE FIELD email ON TABLE user_module_grant TYPE string;
DEFINE FIELD module_id ON TABLE user_module_grant TYPE int;
DEFINE FIELD user_role_id ON TABLE user_module_grant TYPE int;
DEFINE FIELD enabled ON TABLE user_module_grant TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE user_module_grant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_grant_email_module ON TABLE user_module_grant \
    COLUMNS email, module_id UNIQUE;

-- =======================================================================
-- Access requests (pending 8, approved 11, rejected 12)
-- =======================================================================
DEFINE TABLE access_request SCHEMAFULL;
DEFINE FIELD email ON TABLE access_request TYPE string;
DEFINE FIELD contact_id ON TABLE access_request TYPE option<string>;
DEFINE FIELD requested_module ON TABLE access_request TYPE int;
DEFINE FIELD status ON TABLE access_request TYPE int \
    ASSERT $value IN [8, 11, 12];
DEFINE FIELD approver_id ON TABLE access_request TYPE option<string>;
DEFINE FIELD approver_name ON TABLE access_request TYPE option<string>;
DEFINE FIELD approver_email ON TABLE access_request \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE access_request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE access_request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_request_email_module ON TABLE access_request \
    COLUMNS email, requested_module;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
