//! SurrealDB repository implementations.

mod invitation;
mod session;
mod user;

pub use invitation::SurrealInvitationRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;

/// How many times a write that lost an optimistic-concurrency race is
/// re-issued before the conflict is reported.
const MAX_CONFLICT_RETRIES: u32 = 5;
