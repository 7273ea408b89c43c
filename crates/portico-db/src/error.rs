//! Database-specific error types and conversions.

use portico_core::error::PorticoError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A row came back in a shape the mapper cannot interpret.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<DbError> for PorticoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PorticoError::StateNotFound { entity, id },
            other => PorticoError::Database(other.to_string()),
        }
    }
}
