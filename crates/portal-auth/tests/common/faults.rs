//! Repository wrappers that fail or stall selected calls, delegating
//! everything else to the in-memory store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use portal_auth::config::AuthConfig;
use portal_auth::service::AuthService;
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::invitation::{CreateInvitationCode, InvitationCode};
use portal_core::models::user::{CreateUser, UpdateUser, User};
use portal_core::repository::{InvitationRepository, UserRepository};
use portal_db::repository::{
    SurrealInvitationRepository, SurrealSessionRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::memory_db;

/// How a wrapped call misbehaves.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Error,
    Stall(Duration),
}

impl Fault {
    async fn trigger(self, call: &str) -> PortalResult<()> {
        match self {
            Fault::Error => Err(PortalError::Database(format!("{call}: store unavailable"))),
            Fault::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserFaults {
    pub find_by_email: Option<Fault>,
    pub record_login: Option<Fault>,
}

pub struct FaultyUsers {
    inner: SurrealUserRepository<Db>,
    faults: UserFaults,
}

impl UserRepository for FaultyUsers {
    async fn create(&self, input: CreateUser) -> PortalResult<User> {
        self.inner.create(input).await
    }

    async fn get_by_email(&self, email: &str) -> PortalResult<User> {
        self.inner.get_by_email(email).await
    }

    async fn find_by_email(&self, email: &str) -> PortalResult<Option<User>> {
        if let Some(fault) = self.faults.find_by_email {
            fault.trigger("find_by_email").await?;
        }
        self.inner.find_by_email(email).await
    }

    async fn record_login(&self, email: &str, at: DateTime<Utc>) -> PortalResult<()> {
        if let Some(fault) = self.faults.record_login {
            fault.trigger("record_login").await?;
        }
        self.inner.record_login(email, at).await
    }

    async fn update(&self, email: &str, input: UpdateUser) -> PortalResult<User> {
        self.inner.update(email, input).await
    }
}

pub struct FaultyInvitations {
    inner: SurrealInvitationRepository<Db>,
    consume: Option<Fault>,
}

impl InvitationRepository for FaultyInvitations {
    async fn create(&self, input: CreateInvitationCode) -> PortalResult<InvitationCode> {
        self.inner.create(input).await
    }

    async fn get(&self, code: &str) -> PortalResult<InvitationCode> {
        self.inner.get(code).await
    }

    async fn consume(&self, code: &str, now: DateTime<Utc>) -> PortalResult<bool> {
        if let Some(fault) = self.consume {
            fault.trigger("consume").await?;
        }
        self.inner.consume(code, now).await
    }

    async fn deactivate(&self, code: &str) -> PortalResult<()> {
        self.inner.deactivate(code).await
    }
}

pub type FaultyService =
    AuthService<FaultyUsers, FaultyInvitations, SurrealSessionRepository<Db>>;

/// Service over an in-memory DB whose user and invitation stores
/// misbehave as requested.
pub async fn faulty_setup(
    config: AuthConfig,
    user_faults: UserFaults,
    consume_fault: Option<Fault>,
) -> (FaultyService, Surreal<Db>) {
    let db = memory_db().await;
    let service = AuthService::new(
        FaultyUsers {
            inner: SurrealUserRepository::new(db.clone()),
            faults: user_faults,
        },
        FaultyInvitations {
            inner: SurrealInvitationRepository::new(db.clone()),
            consume: consume_fault,
        },
        SurrealSessionRepository::new(db.clone()),
        config,
    );
    (service, db)
}
