//! Portal Server: request envelopes, operation handlers and HTTP
//! routing for the portal auth service.

pub mod config;
pub mod dto;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod telemetry;

pub use config::ServerConfig;
pub use envelope::{ApiEvent, ApiResponse, CorsConfig};
pub use handlers::{Handlers, Operation, PortalHandlers};
