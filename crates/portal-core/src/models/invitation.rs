//! Invitation code domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCode {
    pub code: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub max_uses: u32,
    pub used_count: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Storage-layer cleanup marker, always later than `expires_at`.
    pub purge_after: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub max_uses: u32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub purge_after: DateTime<Utc>,
}
