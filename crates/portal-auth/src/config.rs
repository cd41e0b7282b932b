//! Authentication configuration.

use std::time::Duration;

use portal_core::models::user::{FrontendType, UserType};
use serde::Deserialize;

use crate::password::PasswordScheme;
use crate::session::SessionPolicy;
use crate::tier::TierTable;

/// Longest session lifetime accepted for either policy (one year).
pub const MAX_SESSION_LIFETIME_SECS: u64 = 366 * 86_400;

/// Configuration for the authentication service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing session tokens.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Which session mechanism login issues.
    pub session_policy: SessionPolicy,
    /// Signed token lifetime in seconds (default: 86_400 = 24 hours).
    pub signed_token_lifetime_secs: u64,
    /// Persisted session lifetime in seconds (default: 7_200 = 120 minutes).
    pub persisted_session_lifetime_secs: u64,
    /// Digest format for newly registered credentials.
    pub password_scheme: PasswordScheme,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Staff tiers and their permission sets.
    pub tiers: TierTable,
    /// Post-login redirect targets.
    pub redirects: RedirectPolicy,
    /// Reject client logins until `is_verified` is set.
    pub require_client_verification: bool,
    /// `is_verified` value stored for new client accounts.
    pub verify_clients_on_registration: bool,
    /// Reject logins that omit `frontend_type` instead of defaulting to
    /// the client portal.
    pub require_login_frontend: bool,
    /// Cookie the guard reads the session token from.
    pub session_cookie_name: String,
    pub invitation: InvitationDefaults,
    /// Upper bound for a single store call in milliseconds.
    pub store_timeout_ms: u64,
}

impl AuthConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Lifetime of a session issued under the active policy, capped at
    /// [`MAX_SESSION_LIFETIME_SECS`].
    pub fn session_lifetime(&self) -> chrono::Duration {
        let secs = match self.session_policy {
            SessionPolicy::SignedClaims => self.signed_token_lifetime_secs,
            SessionPolicy::Persisted => self.persisted_session_lifetime_secs,
        };
        let capped = secs.min(MAX_SESSION_LIFETIME_SECS) as i64;
        chrono::Duration::seconds(capped)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "portal-auth".into(),
            session_policy: SessionPolicy::default(),
            signed_token_lifetime_secs: 86_400,
            persisted_session_lifetime_secs: 7_200,
            password_scheme: PasswordScheme::default(),
            pepper: None,
            tiers: TierTable::default(),
            redirects: RedirectPolicy::default(),
            require_client_verification: false,
            verify_clients_on_registration: true,
            require_login_frontend: false,
            session_cookie_name: "auth_token".into(),
            invitation: InvitationDefaults::default(),
            store_timeout_ms: 5_000,
        }
    }
}

/// Defaults applied when issuing invitation codes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvitationDefaults {
    pub max_uses: u32,
    pub expires_in_days: u32,
    pub created_by: String,
    /// Days past expiry before a code becomes eligible for purging.
    pub purge_grace_days: u32,
    pub code_length: usize,
    /// Fresh codes drawn before giving up on collisions.
    pub max_generation_attempts: u32,
}

impl Default for InvitationDefaults {
    fn default() -> Self {
        Self {
            max_uses: 10,
            expires_in_days: 30,
            created_by: "system".into(),
            purge_grace_days: 2,
            code_length: 8,
            max_generation_attempts: 5,
        }
    }
}

/// Where each kind of user lands after login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedirectPolicy {
    pub staff: String,
    pub client: String,
    pub fallback: String,
}

impl RedirectPolicy {
    pub fn resolve(&self, user_type: UserType, frontend: FrontendType) -> &str {
        match (user_type, frontend) {
            (UserType::Staff, _) => &self.staff,
            (UserType::Client, FrontendType::Client) => &self.client,
            _ => &self.fallback,
        }
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            staff: "/admin/dashboard".into(),
            client: "/dashboard".into(),
            fallback: "/".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_follows_policy() {
        let mut config = AuthConfig::default();
        assert_eq!(config.session_lifetime(), chrono::Duration::hours(24));
        config.session_policy = SessionPolicy::Persisted;
        assert_eq!(config.session_lifetime(), chrono::Duration::minutes(120));
    }

    #[test]
    fn oversized_lifetime_is_capped() {
        let config = AuthConfig {
            signed_token_lifetime_secs: 100_000_000_000_000_000,
            ..AuthConfig::default()
        };
        assert_eq!(
            config.session_lifetime(),
            chrono::Duration::seconds(MAX_SESSION_LIFETIME_SECS as i64)
        );
    }

    #[test]
    fn redirect_targets() {
        let policy = RedirectPolicy::default();
        assert_eq!(
            policy.resolve(UserType::Staff, FrontendType::Staff),
            "/admin/dashboard"
        );
        assert_eq!(
            policy.resolve(UserType::Client, FrontendType::Client),
            "/dashboard"
        );
        assert_eq!(policy.resolve(UserType::Client, FrontendType::Staff), "/");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"jwt_secret": "s3cret", "session_policy": "persisted", "invitation": {"max_uses": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.session_policy, SessionPolicy::Persisted);
        assert_eq!(config.invitation.max_uses, 3);
        assert_eq!(config.invitation.expires_in_days, 30);
        assert_eq!(config.session_cookie_name, "auth_token");
        assert!(config.tiers.validate_tier("admin").is_ok());
    }
}
