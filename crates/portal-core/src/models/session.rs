//! Session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{FrontendType, UserType};

/// Identity and authorization facts carried by a session, whether
/// embedded in a signed token or stored alongside an opaque one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub staff_tier: Option<String>,
    pub permissions: Vec<String>,
    pub frontend_type: FrontendType,
}

impl SessionClaims {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// A persisted opaque session. Only the hash of the token is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub token_hash: String,
    pub claims: SessionClaims,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub token_hash: String,
    pub claims: SessionClaims,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
