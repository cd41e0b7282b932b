//! Domain models shared across all portal crates.

pub mod invitation;
pub mod session;
pub mod user;
