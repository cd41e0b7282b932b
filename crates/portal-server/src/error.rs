//! Startup errors for the server binary.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error(transparent)]
    Database(#[from] portal_db::DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
