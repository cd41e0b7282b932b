//! User domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account classification. Immutable after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Older records were written with the Spanish spelling.
    #[serde(alias = "cliente")]
    Client,
    Staff,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Client => "client",
            UserType::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" | "cliente" => Some(UserType::Client),
            "staff" => Some(UserType::Staff),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which portal originated a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FrontendType {
    Client,
    Staff,
}

impl FrontendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrontendType::Client => "client",
            FrontendType::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(FrontendType::Client),
            "staff" => Some(FrontendType::Staff),
            _ => None,
        }
    }
}

impl fmt::Display for FrontendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier and derived permission set of a staff account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffAssignment {
    pub tier: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    /// Lower-cased, trimmed. Unique lookup key.
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub user_type: UserType,
    /// Present iff `user_type` is [`UserType::Staff`].
    pub staff: Option<StaffAssignment>,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub registration_source: FrontendType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_staff(&self) -> bool {
        self.user_type == UserType::Staff
    }

    pub fn staff_tier(&self) -> Option<&str> {
        self.staff.as_ref().map(|s| s.tier.as_str())
    }

    pub fn permissions(&self) -> &[String] {
        self.staff
            .as_ref()
            .map(|s| s.permissions.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_id: Uuid,
    pub email: String,
    /// Already-computed digest; repositories never see the raw secret.
    pub password_hash: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub user_type: UserType,
    pub staff: Option<StaffAssignment>,
    pub is_verified: bool,
    pub registration_source: FrontendType,
    pub created_at: DateTime<Utc>,
}

impl CreateUser {
    /// Checks the staff-fields invariant: tier and permissions are
    /// present if and only if the account is a staff account.
    pub fn staff_fields_consistent(&self) -> bool {
        (self.user_type == UserType::Staff) == self.staff.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}
