//! Session issuance and verification under either session policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::session::{CreateSession, SessionClaims};
use portal_core::repository::SessionRepository;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::bounded::bounded;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token;

/// How login sessions are represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Stateless HS256 JWT; cannot be revoked before expiry.
    #[default]
    SignedClaims,
    /// Random opaque token looked up in the `session` table.
    Persisted,
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Raw token (return to client; only its hash is ever stored).
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens according to
/// [`AuthConfig::session_policy`].
pub struct SessionIssuer<S: SessionRepository> {
    sessions: S,
    config: Arc<AuthConfig>,
}

impl<S: SessionRepository> SessionIssuer<S> {
    pub fn new(sessions: S, config: Arc<AuthConfig>) -> Self {
        Self { sessions, config }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.config.session_policy
    }

    pub async fn issue(
        &self,
        claims: SessionClaims,
        now: DateTime<Utc>,
    ) -> PortalResult<IssuedSession> {
        let lifetime = self.config.session_lifetime();
        match self.config.session_policy {
            SessionPolicy::SignedClaims => {
                let (token, expires_at) =
                    token::issue_signed_token(&claims, now, lifetime, &self.config)?;
                Ok(IssuedSession { token, expires_at })
            }
            SessionPolicy::Persisted => {
                let raw = token::generate_session_token();
                let expires_at = now + lifetime;
                bounded(
                    self.config.store_timeout(),
                    "session create",
                    self.sessions.create(CreateSession {
                        token_hash: token::hash_session_token(&raw),
                        claims,
                        issued_at: now,
                        expires_at,
                    }),
                )
                .await?;
                Ok(IssuedSession {
                    token: raw,
                    expires_at,
                })
            }
        }
    }

    /// Recover the claims of a live session.
    ///
    /// Malformed, unknown, and expired tokens all fail with
    /// [`AuthError::SessionInvalid`]. Store failures other than a
    /// missing record propagate unchanged.
    pub async fn verify(&self, raw: &str, now: DateTime<Utc>) -> PortalResult<SessionClaims> {
        if raw.is_empty() {
            return Err(AuthError::SessionInvalid.into());
        }

        match self.config.session_policy {
            SessionPolicy::SignedClaims => {
                Ok(token::decode_signed_token(raw, now, &self.config)?)
            }
            SessionPolicy::Persisted => {
                let token_hash = token::hash_session_token(raw);
                let session = match bounded(
                    self.config.store_timeout(),
                    "session lookup",
                    self.sessions.get_by_token_hash(&token_hash),
                )
                .await
                {
                    Ok(session) => session,
                    Err(PortalError::NotFound { .. }) => {
                        debug!("Unknown persisted session token");
                        return Err(AuthError::SessionInvalid.into());
                    }
                    Err(e) => return Err(e),
                };

                if session.expires_at <= now {
                    debug!(session_id = %session.id, "Persisted session expired");
                    if let Err(e) = bounded(
                        self.config.store_timeout(),
                        "session invalidate",
                        self.sessions.invalidate(&token_hash),
                    )
                    .await
                    {
                        warn!(error = %e, "Failed to delete expired session");
                    }
                    return Err(AuthError::SessionInvalid.into());
                }

                Ok(session.claims)
            }
        }
    }

    /// Revoke a session server-side. Returns `false` when the policy
    /// holds no server-side state to revoke.
    pub async fn revoke(&self, raw: &str) -> PortalResult<bool> {
        match self.config.session_policy {
            SessionPolicy::SignedClaims => Ok(false),
            SessionPolicy::Persisted => {
                bounded(
                    self.config.store_timeout(),
                    "session invalidate",
                    self.sessions.invalidate(&token::hash_session_token(raw)),
                )
                .await?;
                Ok(true)
            }
        }
    }

    /// Delete persisted sessions that expired before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> PortalResult<u64> {
        bounded(
            self.config.store_timeout(),
            "session cleanup",
            self.sessions.cleanup_expired(now),
        )
        .await
    }
}
