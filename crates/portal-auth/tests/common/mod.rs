//! Shared fixtures for the auth integration tests.

#![allow(dead_code)]

pub mod faults;

use chrono::{Duration, Utc};
use portal_auth::config::AuthConfig;
use portal_auth::service::{AuthService, LoginInput, RegisterInput};
use portal_core::models::invitation::CreateInvitationCode;
use portal_core::repository::InvitationRepository;
use portal_db::repository::{
    SurrealInvitationRepository, SurrealSessionRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

pub type TestService = AuthService<
    SurrealUserRepository<Db>,
    SurrealInvitationRepository<Db>,
    SurrealSessionRepository<Db>,
>;

pub fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".into(),
        jwt_issuer: "portal-test".into(),
        ..AuthConfig::default()
    }
}

/// Fresh in-memory DB with migrations applied.
pub async fn memory_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    portal_db::run_migrations(&db).await.unwrap();
    db
}

/// In-memory DB with migrations applied, and a service over it.
pub async fn setup(config: AuthConfig) -> (TestService, Surreal<Db>) {
    let db = memory_db().await;

    let service = AuthService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealInvitationRepository::new(db.clone()),
        SurrealSessionRepository::new(db.clone()),
        config,
    );
    (service, db)
}

/// Store an invitation code directly, bypassing the ledger.
pub async fn seed_code(db: &Surreal<Db>, code: &str, max_uses: u32, expires_in: Duration) {
    let now = Utc::now();
    SurrealInvitationRepository::new(db.clone())
        .create(CreateInvitationCode {
            code: code.into(),
            expires_at: now + expires_in,
            max_uses,
            created_by: "system".into(),
            created_at: now - Duration::days(1),
            purge_after: now + expires_in + Duration::days(2),
        })
        .await
        .unwrap();
}

pub async fn used_count(db: &Surreal<Db>, code: &str) -> u32 {
    SurrealInvitationRepository::new(db.clone())
        .get(code)
        .await
        .unwrap()
        .used_count
}

pub fn staff_registration(email: &str, tier: &str, code: &str) -> RegisterInput {
    RegisterInput {
        email: Some(email.into()),
        password: Some("p".into()),
        name: Some("Ana".into()),
        user_type: Some("staff".into()),
        staff_tier: Some(tier.into()),
        invitation_code: Some(code.into()),
        frontend_type: Some("staff".into()),
        ..RegisterInput::default()
    }
}

pub fn client_registration(email: &str) -> RegisterInput {
    RegisterInput {
        email: Some(email.into()),
        password: Some("secret".into()),
        name: Some("Carlos".into()),
        phone: Some("+51 999 999 999".into()),
        user_type: Some("client".into()),
        frontend_type: Some("client".into()),
        ..RegisterInput::default()
    }
}

pub fn login(email: &str, password: &str, frontend: Option<&str>) -> LoginInput {
    LoginInput {
        email: Some(email.into()),
        password: Some(password.into()),
        frontend_type: frontend.map(String::from),
    }
}
