//! SurrealDB implementation of [`UserRepository`].
//!
//! Records live at `user:⟨email⟩`, so creating a user whose email is
//! already taken fails inside the store rather than in a preceding
//! read. That makes concurrent registrations for one address safe: the
//! losing writer gets `AlreadyExists`.

use chrono::{DateTime, Utc};
use portal_core::error::PortalResult;
use portal_core::models::user::{
    CreateUser, FrontendType, StaffAssignment, UpdateUser, User, UserType,
};
use portal_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::MAX_CONFLICT_RETRIES;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    user_id: String,
    email: String,
    password_hash: String,
    name: Option<String>,
    phone: Option<String>,
    gender: Option<String>,
    user_type: String,
    staff_tier: Option<String>,
    permissions: Option<Vec<String>>,
    is_active: bool,
    is_verified: bool,
    last_login: Option<DateTime<Utc>>,
    registration_source: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn corrupt(message: String) -> DbError {
    DbError::Corrupt {
        entity: "user".into(),
        message,
    }
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| corrupt(format!("invalid user_id: {e}")))?;
        let user_type = UserType::parse(&self.user_type)
            .ok_or_else(|| corrupt(format!("unknown user_type: {}", self.user_type)))?;
        let registration_source = FrontendType::parse(&self.registration_source)
            .ok_or_else(|| {
                corrupt(format!(
                    "unknown registration_source: {}",
                    self.registration_source
                ))
            })?;

        // A staff record always carries a tier; permissions may have been
        // written as an empty list.
        let staff = match (user_type, self.staff_tier) {
            (UserType::Staff, Some(tier)) => Some(StaffAssignment {
                tier,
                permissions: self.permissions.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(User {
            user_id,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            phone: self.phone,
            gender: self.gender,
            user_type,
            staff,
            is_active: self.is_active,
            is_verified: self.is_verified,
            last_login: self.last_login,
            registration_source,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn insert(&self, input: &CreateUser) -> Result<User, DbError> {
        let (staff_tier, permissions) = match &input.staff {
            Some(staff) => (Some(staff.tier.clone()), Some(staff.permissions.clone())),
            None => (None, None),
        };

        let result = self
            .db
            .query(
                "CREATE type::record('user', $email) SET \
                 user_id = $user_id, email = $email, \
                 password_hash = $password_hash, \
                 name = $name, phone = $phone, gender = $gender, \
                 user_type = $user_type, \
                 staff_tier = $staff_tier, permissions = $permissions, \
                 is_active = true, is_verified = $is_verified, \
                 last_login = NONE, \
                 registration_source = $registration_source, \
                 created_at = $created_at, updated_at = $created_at",
            )
            .bind(("email", input.email.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("password_hash", input.password_hash.clone()))
            .bind(("name", input.name.clone()))
            .bind(("phone", input.phone.clone()))
            .bind(("gender", input.gender.clone()))
            .bind(("user_type", input.user_type.as_str().to_string()))
            .bind(("staff_tier", staff_tier))
            .bind(("permissions", permissions))
            .bind(("is_verified", input.is_verified))
            .bind((
                "registration_source",
                input.registration_source.as_str().to_string(),
            ))
            .bind(("created_at", input.created_at))
            .await
            .map_err(|e| DbError::from_write("user", e.to_string()))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("user", e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: input.email.clone(),
        })?;

        row.try_into_user()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> PortalResult<User> {
        if !input.staff_fields_consistent() {
            return Err(DbError::Query(format!(
                "staff fields must be set iff user_type is staff (user_type={})",
                input.user_type
            ))
            .into());
        }

        let mut attempt = 0;
        loop {
            match self.insert(&input).await {
                Err(DbError::TransactionConflict(message)) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(attempt, %message, "Retrying user insert after write conflict");
                }
                other => return Ok(other?),
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> PortalResult<User> {
        self.find_by_email(email).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "user".into(),
                id: email.to_string(),
            }
            .into()
        })
    }

    async fn find_by_email(&self, email: &str) -> PortalResult<Option<User>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $email)")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_user()?)),
            None => Ok(None),
        }
    }

    async fn record_login(&self, email: &str, at: DateTime<Utc>) -> PortalResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $email) SET \
                 last_login = $at, updated_at = $at",
            )
            .bind(("email", email.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: email.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn update(&self, email: &str, input: UpdateUser) -> PortalResult<User> {
        let mut sets = Vec::new();
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.is_verified.is_some() {
            sets.push("is_verified = $is_verified");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $email) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("email", email.to_string()));
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(is_verified) = input.is_verified {
            builder = builder.bind(("is_verified", is_verified));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: email.to_string(),
        })?;

        Ok(row.try_into_user()?)
    }
}
