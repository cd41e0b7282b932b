//! HTTP routing.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};

use crate::envelope::{ApiEvent, ApiResponse};
use crate::handlers::{Operation, PortalHandlers};

type AppState = State<Arc<PortalHandlers>>;

pub fn router(handlers: Arc<PortalHandlers>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register).options(preflight))
        .route("/auth/login", post(login).options(preflight))
        .route("/auth/logout", post(logout).options(preflight))
        .route(
            "/auth/invitation-codes",
            post(issue_invitation).options(preflight),
        )
        .with_state(handlers)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn preflight(State(handlers): AppState) -> ApiResponse {
    handlers.preflight()
}

async fn register(State(handlers): AppState, headers: HeaderMap, body: Bytes) -> ApiResponse {
    dispatch(&handlers, Operation::Register, &headers, &body).await
}

async fn login(State(handlers): AppState, headers: HeaderMap, body: Bytes) -> ApiResponse {
    dispatch(&handlers, Operation::Login, &headers, &body).await
}

async fn logout(State(handlers): AppState, headers: HeaderMap, body: Bytes) -> ApiResponse {
    dispatch(&handlers, Operation::Logout, &headers, &body).await
}

async fn issue_invitation(
    State(handlers): AppState,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    dispatch(&handlers, Operation::IssueInvitation, &headers, &body).await
}

async fn dispatch(
    handlers: &PortalHandlers,
    operation: Operation,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResponse {
    let event = match ApiEvent::from_http(header_map(headers), body) {
        Ok(event) => event,
        Err(e) => return handlers.error(&e),
    };
    match operation {
        Operation::Register => handlers.register(event).await,
        Operation::Login => handlers.login(event).await,
        Operation::Logout => handlers.logout(event).await,
        Operation::IssueInvitation => handlers.issue_invitation(event).await,
    }
}

/// Flatten HTTP headers; repeated names keep their last value.
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}
