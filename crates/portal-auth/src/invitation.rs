//! Invitation ledger: issuance and redemption of staff invitation codes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::invitation::{CreateInvitationCode, InvitationCode};
use portal_core::repository::InvitationRepository;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::bounded::bounded;
use crate::config::AuthConfig;
use crate::error::AuthError;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Request to issue a new invitation code. Absent fields take the
/// configured defaults.
#[derive(Debug, Clone, Default)]
pub struct IssueInvitation {
    pub max_uses: Option<i64>,
    pub expires_in_days: Option<i64>,
    pub created_by: Option<String>,
}

pub struct InvitationLedger<I: InvitationRepository> {
    invitations: I,
    config: Arc<AuthConfig>,
}

impl<I: InvitationRepository> InvitationLedger<I> {
    pub fn new(invitations: I, config: Arc<AuthConfig>) -> Self {
        Self {
            invitations,
            config,
        }
    }

    /// Take one use of `code` if it is redeemable at `now`.
    ///
    /// Fails closed: empty, unknown, inactive, expired, and exhausted
    /// codes return `false`, and so does any store error.
    pub async fn validate_and_consume(&self, code: &str, now: DateTime<Utc>) -> bool {
        if code.is_empty() {
            return false;
        }

        match bounded(
            self.config.store_timeout(),
            "invitation consume",
            self.invitations.consume(code, now),
        )
        .await
        {
            Ok(true) => {
                debug!(code, "Invitation code redeemed");
                true
            }
            Ok(false) => {
                debug!(code, "Invitation code not redeemable");
                false
            }
            Err(e) => {
                warn!(code, error = %e, "Invitation lookup failed; treating code as invalid");
                false
            }
        }
    }

    /// Generate and persist a new code.
    ///
    /// Collisions with existing codes are retried with a fresh code up
    /// to `invitation.max_generation_attempts` times.
    pub async fn issue(
        &self,
        request: IssueInvitation,
        now: DateTime<Utc>,
    ) -> PortalResult<InvitationCode> {
        let defaults = &self.config.invitation;

        let max_uses = request.max_uses.unwrap_or(i64::from(defaults.max_uses));
        let max_uses = u32::try_from(max_uses)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(AuthError::InvalidMaxUses)?;

        let days = request
            .expires_in_days
            .unwrap_or(i64::from(defaults.expires_in_days));
        if days < 1 {
            return Err(AuthError::InvalidExpiry.into());
        }
        let expires_at = Duration::try_days(days)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or(AuthError::InvalidExpiry)?;
        let purge_after = Duration::try_days(i64::from(defaults.purge_grace_days))
            .and_then(|d| expires_at.checked_add_signed(d))
            .ok_or(AuthError::InvalidExpiry)?;

        let created_by = request
            .created_by
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| defaults.created_by.clone());

        for attempt in 1..=defaults.max_generation_attempts {
            let code = generate_code(defaults.code_length);
            let result = bounded(
                self.config.store_timeout(),
                "invitation create",
                self.invitations.create(CreateInvitationCode {
                    code: code.clone(),
                    expires_at,
                    max_uses,
                    created_by: created_by.clone(),
                    created_at: now,
                    purge_after,
                }),
            )
            .await;

            match result {
                Ok(invitation) => {
                    info!(
                        code = %invitation.code,
                        max_uses,
                        created_by = %invitation.created_by,
                        "Invitation code issued"
                    );
                    return Ok(invitation);
                }
                Err(PortalError::AlreadyExists { .. }) => {
                    debug!(attempt, "Invitation code collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(PortalError::Internal(format!(
            "no unique invitation code after {} attempts",
            defaults.max_generation_attempts
        )))
    }

    /// Deactivate a code so it can no longer be redeemed.
    pub async fn revoke(&self, code: &str) -> PortalResult<()> {
        bounded(
            self.config.store_timeout(),
            "invitation deactivate",
            self.invitations.deactivate(code),
        )
        .await?;
        info!(code, "Invitation code revoked");
        Ok(())
    }
}

/// Random uppercase alphanumeric code.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}
