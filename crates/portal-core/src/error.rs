//! Error types for the portal auth system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("{message}")]
    MissingFields { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{reason}")]
    AuthenticationFailed { reason: String },

    #[error("{reason}")]
    AuthorizationDenied { reason: String },

    /// Authorization denial that the caller can resolve by verifying
    /// the account's email address.
    #[error("{reason}")]
    VerificationRequired { reason: String },

    #[error("{reason}")]
    Conflict { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Store call timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    /// Whether the error carries a message that is safe to show to the
    /// caller. Everything else collapses into a generic internal error.
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            Self::MissingFields { .. }
                | Self::Validation { .. }
                | Self::AuthenticationFailed { .. }
                | Self::AuthorizationDenied { .. }
                | Self::VerificationRequired { .. }
                | Self::Conflict { .. }
        )
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
