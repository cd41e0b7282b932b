//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use portal_core::error::PortalResult;
use portal_core::models::session::{CreateSession, Session, SessionClaims};
use portal_core::models::user::{FrontendType, UserType};
use portal_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    token_hash: String,
    user_id: String,
    email: String,
    user_type: String,
    staff_tier: Option<String>,
    permissions: Vec<String>,
    frontend_type: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn corrupt(message: String) -> DbError {
    DbError::Corrupt {
        entity: "session".into(),
        message,
    }
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| corrupt(format!("invalid id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| corrupt(format!("invalid user_id: {e}")))?;
        let user_type = UserType::parse(&self.user_type)
            .ok_or_else(|| corrupt(format!("unknown user_type: {}", self.user_type)))?;
        let frontend_type = FrontendType::parse(&self.frontend_type)
            .ok_or_else(|| corrupt(format!("unknown frontend_type: {}", self.frontend_type)))?;

        Ok(Session {
            id,
            token_hash: self.token_hash,
            claims: SessionClaims {
                user_id,
                email: self.email,
                user_type,
                staff_tier: self.staff_tier,
                permissions: self.permissions,
                frontend_type,
            },
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> PortalResult<Session> {
        let id = Uuid::new_v4();
        let claims = input.claims;

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 token_hash = $token_hash, \
                 user_id = $user_id, email = $email, \
                 user_type = $user_type, staff_tier = $staff_tier, \
                 permissions = $permissions, \
                 frontend_type = $frontend_type, \
                 issued_at = $issued_at, expires_at = $expires_at; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('session', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("user_id", claims.user_id.to_string()))
            .bind(("email", claims.email))
            .bind(("user_type", claims.user_type.as_str().to_string()))
            .bind(("staff_tier", claims.staff_tier))
            .bind(("permissions", claims.permissions))
            .bind(("frontend_type", claims.frontend_type.as_str().to_string()))
            .bind(("issued_at", input.issued_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("session", e.to_string()))?;

        let rows: Vec<SessionRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id.to_string(),
        })?;

        Ok(row.try_into_session()?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> PortalResult<Session> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "token_hash".into(),
        })?;

        Ok(row.try_into_session()?)
    }

    async fn invalidate(&self, token_hash: &str) -> PortalResult<()> {
        self.db
            .query("DELETE session WHERE token_hash = $token_hash")
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> PortalResult<u64> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE expires_at <= $now GROUP ALL",
            )
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE expires_at <= $now")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }
}
