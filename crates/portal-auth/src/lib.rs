//! Authentication and authorization core for the client and staff
//! portals.

mod bounded;
pub mod config;
pub mod error;
pub mod guard;
pub mod invitation;
pub mod password;
pub mod service;
pub mod session;
pub mod tier;
pub mod token;

pub use config::{AuthConfig, InvitationDefaults, RedirectPolicy};
pub use error::AuthError;
pub use guard::{AuthGuard, extract_token};
pub use invitation::{InvitationLedger, IssueInvitation};
pub use password::PasswordScheme;
pub use service::{AuthService, LoginInput, LoginOutput, LogoutOutput, RegisterInput};
pub use session::{IssuedSession, SessionIssuer, SessionPolicy};
pub use tier::{GENERATE_INVITATION_CODES, TierTable};
