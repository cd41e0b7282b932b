//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations must make
//! `create` an insert-if-absent write and `consume` an atomic
//! conditional increment; the auth workflows rely on both for their
//! uniqueness and over-redemption guarantees.

use chrono::{DateTime, Utc};

use crate::error::PortalResult;
use crate::models::{
    invitation::{CreateInvitationCode, InvitationCode},
    session::{CreateSession, Session},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Insert a new user keyed by email. Fails with `AlreadyExists` if
    /// a record with the same email is already stored.
    fn create(&self, input: CreateUser) -> impl Future<Output = PortalResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = PortalResult<User>> + Send;
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = PortalResult<Option<User>>> + Send;
    /// Set `last_login` and `updated_at` to `at`.
    fn record_login(
        &self,
        email: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = PortalResult<()>> + Send;
    fn update(
        &self,
        email: &str,
        input: UpdateUser,
    ) -> impl Future<Output = PortalResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Invitation codes
// ---------------------------------------------------------------------------

pub trait InvitationRepository: Send + Sync {
    /// Insert a new code. Fails with `AlreadyExists` on collision.
    fn create(
        &self,
        input: CreateInvitationCode,
    ) -> impl Future<Output = PortalResult<InvitationCode>> + Send;
    fn get(&self, code: &str) -> impl Future<Output = PortalResult<InvitationCode>> + Send;
    /// Atomically take one use of `code` if it is redeemable at `now`.
    ///
    /// Returns `Ok(true)` if a use was taken, `Ok(false)` if the code is
    /// missing, inactive, expired, or exhausted.
    fn consume(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = PortalResult<bool>> + Send;
    fn deactivate(&self, code: &str) -> impl Future<Output = PortalResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Persisted sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = PortalResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = PortalResult<Session>> + Send;
    fn invalidate(&self, token_hash: &str) -> impl Future<Output = PortalResult<()>> + Send;
    /// Delete sessions that expired before `now`; returns how many.
    fn cleanup_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = PortalResult<u64>> + Send;
}
