//! Database-specific error types and conversions.

use portal_core::error::PortalError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },

    /// Optimistic transaction lost a race with a concurrent writer; the
    /// statement can be retried.
    #[error("Write conflict: {0}")]
    TransactionConflict(String),

    #[error("Corrupt {entity} record: {message}")]
    Corrupt { entity: String, message: String },
}

impl DbError {
    /// Classify a failed write. SurrealDB reports both record-id and
    /// unique-index collisions as statement errors, so the message is
    /// the only signal available.
    pub(crate) fn from_write(entity: &str, message: String) -> Self {
        if message.contains("already exists") || message.contains("already contains") {
            DbError::AlreadyExists {
                entity: entity.into(),
            }
        } else if message.contains("conflict") {
            DbError::TransactionConflict(message)
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for PortalError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PortalError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => PortalError::AlreadyExists { entity },
            other => PortalError::Database(other.to_string()),
        }
    }
}
