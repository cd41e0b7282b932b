//! SurrealDB implementation of [`InvitationRepository`].

use chrono::{DateTime, Utc};
use portal_core::error::PortalResult;
use portal_core::models::invitation::{CreateInvitationCode, InvitationCode};
use portal_core::repository::InvitationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use super::MAX_CONFLICT_RETRIES;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct InvitationRow {
    code: String,
    is_active: bool,
    expires_at: DateTime<Utc>,
    max_uses: u32,
    used_count: u32,
    created_by: String,
    created_at: DateTime<Utc>,
    purge_after: DateTime<Utc>,
}

impl From<InvitationRow> for InvitationCode {
    fn from(row: InvitationRow) -> Self {
        InvitationCode {
            code: row.code,
            is_active: row.is_active,
            expires_at: row.expires_at,
            max_uses: row.max_uses,
            used_count: row.used_count,
            created_by: row.created_by,
            created_at: row.created_at,
            purge_after: row.purge_after,
        }
    }
}

/// SurrealDB implementation of the invitation code repository.
#[derive(Clone)]
pub struct SurrealInvitationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInvitationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// The WHERE guard and the increment run as one statement, so
    /// concurrent redemptions can never push `used_count` past
    /// `max_uses`. An empty result means nothing was consumed.
    async fn take_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool, DbError> {
        let result = self
            .db
            .query(
                "UPDATE type::record('invitation_code', $code) \
                 SET used_count += 1 \
                 WHERE is_active = true \
                 AND expires_at > $now \
                 AND used_count < max_uses",
            )
            .bind(("code", code.to_string()))
            .bind(("now", now))
            .await
            .map_err(|e| DbError::from_write("invitation_code", e.to_string()))?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("invitation_code", e.to_string()))?;

        let rows: Vec<InvitationRow> = result.take(0)?;
        Ok(!rows.is_empty())
    }
}

impl<C: Connection> InvitationRepository for SurrealInvitationRepository<C> {
    async fn create(&self, input: CreateInvitationCode) -> PortalResult<InvitationCode> {
        let code = input.code.clone();

        let result = self
            .db
            .query(
                "CREATE type::record('invitation_code', $code) SET \
                 code = $code, is_active = true, \
                 expires_at = $expires_at, \
                 max_uses = $max_uses, used_count = 0, \
                 created_by = $created_by, created_at = $created_at, \
                 purge_after = $purge_after",
            )
            .bind(("code", input.code))
            .bind(("expires_at", input.expires_at))
            .bind(("max_uses", input.max_uses))
            .bind(("created_by", input.created_by))
            .bind(("created_at", input.created_at))
            .bind(("purge_after", input.purge_after))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("invitation_code", e.to_string()))?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation_code".into(),
            id: code,
        })?;

        Ok(row.into())
    }

    async fn get(&self, code: &str) -> PortalResult<InvitationCode> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('invitation_code', $code)")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invitation_code".into(),
            id: code.to_string(),
        })?;

        Ok(row.into())
    }

    async fn consume(&self, code: &str, now: DateTime<Utc>) -> PortalResult<bool> {
        let mut attempt = 0;
        loop {
            match self.take_use(code, now).await {
                Err(DbError::TransactionConflict(message)) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(attempt, %message, "Retrying invitation consume after write conflict");
                }
                other => return Ok(other?),
            }
        }
    }

    async fn deactivate(&self, code: &str) -> PortalResult<()> {
        let mut result = self
            .db
            .query("UPDATE type::record('invitation_code', $code) SET is_active = false")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "invitation_code".into(),
                id: code.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
