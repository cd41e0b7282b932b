//! Authentication service: registration, login, logout and invitation
//! issuance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use portal_core::error::{PortalError, PortalResult};
use portal_core::models::invitation::InvitationCode;
use portal_core::models::session::SessionClaims;
use portal_core::models::user::{CreateUser, FrontendType, StaffAssignment, User, UserType};
use portal_core::repository::{InvitationRepository, SessionRepository, UserRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bounded::bounded;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::guard::AuthGuard;
use crate::invitation::{InvitationLedger, IssueInvitation};
use crate::password;
use crate::session::{SessionIssuer, SessionPolicy};

/// Input for the registration flow. Fields are as received; the
/// workflow normalises and validates them.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub user_type: Option<String>,
    pub staff_tier: Option<String>,
    pub invitation_code: Option<String>,
    pub frontend_type: Option<String>,
}

/// Input for the login flow.
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub frontend_type: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// The account, with `last_login` set to this login.
    pub user: User,
    /// Session token (signed JWT or opaque, per policy).
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub redirect_to: String,
    pub logged_in_at: DateTime<Utc>,
    pub frontend_type: FrontendType,
}

#[derive(Debug)]
pub struct LogoutOutput {
    /// Whether a server-side session was deleted.
    pub revoked: bool,
    pub logged_out_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, I, S>
where
    U: UserRepository,
    I: InvitationRepository,
    S: SessionRepository,
{
    user_repo: U,
    ledger: InvitationLedger<I>,
    sessions: SessionIssuer<S>,
    config: Arc<AuthConfig>,
}

impl<U, I, S> AuthService<U, I, S>
where
    U: UserRepository,
    I: InvitationRepository,
    S: SessionRepository,
{
    pub fn new(user_repo: U, invitation_repo: I, session_repo: S, config: AuthConfig) -> Self {
        let config = Arc::new(config);
        Self {
            user_repo,
            ledger: InvitationLedger::new(invitation_repo, Arc::clone(&config)),
            sessions: SessionIssuer::new(session_repo, Arc::clone(&config)),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn ledger(&self) -> &InvitationLedger<I> {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionIssuer<S> {
        &self.sessions
    }

    pub fn guard(&self) -> AuthGuard<'_, S> {
        AuthGuard::new(&self.sessions, &self.config.session_cookie_name)
    }

    /// Register a client or staff account. Does not log the user in.
    pub async fn register(&self, input: RegisterInput) -> PortalResult<User> {
        let now = Utc::now();

        // 1. Required fields.
        let email = normalize_email(input.email.as_deref());
        let password = input.password.filter(|p| !p.is_empty());
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AuthError::MissingCredentials.into());
        };

        // 2. Effective frontend.
        let explicit_frontend = non_empty(input.frontend_type.as_deref())
            .map(|f| FrontendType::parse(f).ok_or(AuthError::InvalidFrontend))
            .transpose()?;
        let frontend = explicit_frontend.unwrap_or(FrontendType::Client);

        // 3. Portal segregation.
        let requested_type = non_empty(input.user_type.as_deref()).unwrap_or("client");
        let parsed_type = UserType::parse(requested_type);
        match (explicit_frontend, parsed_type) {
            (Some(FrontendType::Staff), Some(UserType::Staff)) => {}
            (Some(FrontendType::Staff), _) => {
                return Err(AuthError::StaffPortalRegistrationOnly.into());
            }
            (Some(FrontendType::Client), Some(UserType::Client)) => {}
            (Some(FrontendType::Client), _) => {
                return Err(AuthError::ClientPortalRegistrationOnly.into());
            }
            (None, Some(UserType::Staff)) => {
                return Err(AuthError::StaffFrontendRequired.into());
            }
            (None, _) => {}
        }

        // 4. Invitation gate for staff.
        if parsed_type == Some(UserType::Staff) {
            let code = non_empty(input.invitation_code.as_deref()).unwrap_or_default();
            if !self.ledger.validate_and_consume(code, now).await {
                warn!(%email, "Staff registration rejected: invitation code not redeemable");
                return Err(AuthError::InvalidInvitationCode.into());
            }
        }

        // 5. User type.
        let user_type = parsed_type.ok_or(AuthError::InvalidUserType)?;

        // 6. Staff tier and permissions.
        let staff = match user_type {
            UserType::Staff => {
                let tier =
                    non_empty(input.staff_tier.as_deref()).ok_or(AuthError::MissingStaffTier)?;
                let tier = self.config.tiers.validate_tier(tier)?;
                Some(StaffAssignment {
                    tier: tier.to_string(),
                    permissions: self.config.tiers.permissions_for(tier),
                })
            }
            UserType::Client => None,
        };

        // 7. Early duplicate check. The insert below is authoritative, so
        //    a failed read only costs us the early exit.
        match bounded(
            self.config.store_timeout(),
            "user lookup",
            self.user_repo.find_by_email(&email),
        )
        .await
        {
            Ok(Some(_)) => return Err(AuthError::EmailTaken.into()),
            Ok(None) => {}
            Err(e) => warn!(%email, error = %e, "Existing-user check failed; relying on insert"),
        }

        // 8. Build the record.
        let password_hash = password::hash_password(
            &password,
            self.config.password_scheme,
            self.config.pepper.as_deref(),
        )?;
        let is_verified = match user_type {
            UserType::Staff => true,
            UserType::Client => self.config.verify_clients_on_registration,
        };

        // 9. Insert-if-absent.
        let user = bounded(
            self.config.store_timeout(),
            "user create",
            self.user_repo.create(CreateUser {
                user_id: Uuid::new_v4(),
                email,
                password_hash,
                name: input.name,
                phone: input.phone,
                gender: input.gender,
                user_type,
                staff,
                is_verified,
                registration_source: frontend,
                created_at: now,
            }),
        )
        .await
        .map_err(|e| match e {
            PortalError::AlreadyExists { .. } => PortalError::from(AuthError::EmailTaken),
            other => other,
        })?;

        info!(
            email = %user.email,
            user_type = %user.user_type,
            frontend_type = %frontend,
            "User registered"
        );
        Ok(user)
    }

    /// Authenticate against one of the two portals and issue a session.
    pub async fn login(&self, input: LoginInput) -> PortalResult<LoginOutput> {
        let now = Utc::now();

        // 1. Required fields.
        let email = normalize_email(input.email.as_deref());
        let password = input.password.filter(|p| !p.is_empty());
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AuthError::MissingCredentials.into());
        };

        // 2. Frontend.
        let frontend = match non_empty(input.frontend_type.as_deref()) {
            Some(f) => FrontendType::parse(f).ok_or(AuthError::InvalidFrontend)?,
            None if self.config.require_login_frontend => {
                return Err(AuthError::MissingFrontend.into());
            }
            None => FrontendType::Client,
        };

        // 3. Lookup. Unknown emails look exactly like bad passwords.
        let mut user = bounded(
            self.config.store_timeout(),
            "user lookup",
            self.user_repo.find_by_email(&email),
        )
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        // 4. Credential check.
        let valid = password::verify_password(
            &password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 5. Account state.
        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        // 6. Portal segregation.
        match frontend {
            FrontendType::Staff => {
                if !user.is_staff() {
                    return Err(AuthError::StaffPortalOnly.into());
                }
                if user.staff_tier().is_none() {
                    return Err(AuthError::IncompleteStaffAccount.into());
                }
            }
            FrontendType::Client => {
                if user.is_staff() {
                    return Err(AuthError::ClientPortalOnly.into());
                }
                if self.config.require_client_verification && !user.is_verified {
                    return Err(AuthError::EmailNotVerified.into());
                }
            }
        }

        // 7. Last login, best-effort.
        if let Err(e) = bounded(
            self.config.store_timeout(),
            "last-login update",
            self.user_repo.record_login(&email, now),
        )
        .await
        {
            warn!(%email, error = %e, "Failed to record last login");
        }
        user.last_login = Some(now);
        user.updated_at = now;

        // 8. Session.
        let claims = SessionClaims {
            user_id: user.user_id,
            email: user.email.clone(),
            user_type: user.user_type,
            staff_tier: user.staff_tier().map(str::to_string),
            permissions: self.session_permissions(&user),
            frontend_type: frontend,
        };
        let issued = self.sessions.issue(claims, now).await?;

        // 9. Redirect.
        let redirect_to = self
            .config
            .redirects
            .resolve(user.user_type, frontend)
            .to_string();

        info!(
            email = %user.email,
            user_type = %user.user_type,
            frontend_type = %frontend,
            "User logged in"
        );

        Ok(LoginOutput {
            user,
            token: issued.token,
            expires_at: issued.expires_at,
            redirect_to,
            logged_in_at: now,
            frontend_type: frontend,
        })
    }

    /// Acknowledge a logout. Under the persisted policy the presented
    /// session is also deleted, best-effort.
    pub async fn logout(&self, token: Option<&str>) -> LogoutOutput {
        let logged_out_at = Utc::now();
        let revoked = match (self.sessions.policy(), token) {
            (SessionPolicy::Persisted, Some(token)) if !token.is_empty() => {
                match self.sessions.revoke(token).await {
                    Ok(revoked) => revoked,
                    Err(e) => {
                        warn!(error = %e, "Failed to revoke session on logout");
                        false
                    }
                }
            }
            _ => false,
        };

        LogoutOutput {
            revoked,
            logged_out_at,
        }
    }

    /// Issue a staff invitation code.
    pub async fn issue_invitation(&self, request: IssueInvitation) -> PortalResult<InvitationCode> {
        self.ledger.issue(request, Utc::now()).await
    }

    /// Permissions for a fresh session: the tier table's current set
    /// when the tier is still configured, else what the account stores.
    fn session_permissions(&self, user: &User) -> Vec<String> {
        match user.staff_tier() {
            Some(tier) if self.config.tiers.validate_tier(tier).is_ok() => {
                self.config.tiers.permissions_for(tier)
            }
            _ => user.permissions().to_vec(),
        }
    }
}

fn normalize_email(raw: Option<&str>) -> Option<String> {
    non_empty(raw).map(str::to_lowercase)
}

/// Trimmed value, or `None` when absent or blank.
fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}
