//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. Users are keyed by their normalised email
//! and invitation codes by the code string, so a plain `CREATE` on the
//! record id is already an insert-if-absent write; the UNIQUE indexes
//! back that up for writers that do not go through the record id.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "portal_auth_schema",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (record id = normalised email)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE option<string>;
DEFINE FIELD phone ON TABLE user TYPE option<string>;
DEFINE FIELD gender ON TABLE user TYPE option<string>;
DEFINE FIELD user_type ON TABLE user TYPE string \
    ASSERT $value IN ['client', 'staff'];
DEFINE FIELD staff_tier ON TABLE user TYPE option<string>;
DEFINE FIELD permissions ON TABLE user TYPE option<array<string>>;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD is_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD last_login ON TABLE user TYPE option<datetime>;
DEFINE FIELD registration_source ON TABLE user TYPE string \
    ASSERT $value IN ['client', 'staff'];
DEFINE FIELD created_at ON TABLE user TYPE datetime;
DEFINE FIELD updated_at ON TABLE user TYPE datetime;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_user_id ON TABLE user COLUMNS user_id UNIQUE;

-- =======================================================================
-- Invitation codes (record id = code)
-- =======================================================================
DEFINE TABLE invitation_code SCHEMAFULL;
DEFINE FIELD code ON TABLE invitation_code TYPE string;
DEFINE FIELD is_active ON TABLE invitation_code TYPE bool DEFAULT true;
DEFINE FIELD expires_at ON TABLE invitation_code TYPE datetime;
DEFINE FIELD max_uses ON TABLE invitation_code TYPE int \
    ASSERT $value >= 1;
DEFINE FIELD used_count ON TABLE invitation_code TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_by ON TABLE invitation_code TYPE string;
DEFINE FIELD created_at ON TABLE invitation_code TYPE datetime;
DEFINE FIELD purge_after ON TABLE invitation_code TYPE datetime;
DEFINE INDEX idx_invitation_code ON TABLE invitation_code \
    COLUMNS code UNIQUE;
DEFINE INDEX idx_invitation_purge ON TABLE invitation_code \
    COLUMNS purge_after;

-- =======================================================================
-- Persisted sessions (opaque-token policy only)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD email ON TABLE session TYPE string;
DEFINE FIELD user_type ON TABLE session TYPE string \
    ASSERT $value IN ['client', 'staff'];
DEFINE FIELD staff_tier ON TABLE session TYPE option<string>;
DEFINE FIELD permissions ON TABLE session TYPE array<string>;
DEFINE FIELD frontend_type ON TABLE session TYPE string \
    ASSERT $value IN ['client', 'staff'];
DEFINE FIELD issued_at ON TABLE session TYPE datetime;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_user ON TABLE session COLUMNS user_id;
";

/// Bring the database up to the newest schema version.
///
/// Applied versions are tracked in `_migration`; a migration and its
/// tracking row are written by the same query.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("tracking table: {e}")))?;

    let applied = applied_version(db).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        debug!(version = applied, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        apply(db, migration).await?;
    }
    Ok(())
}

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.into_iter().map(|m| m.version).max().unwrap_or(0))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    info!(version = migration.version, name = migration.name, "Applying schema migration");
    db.query(migration.sql)
        .query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("{} (v{}): {e}", migration.name, migration.version)))?;
    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
