//! Deadline for store calls.

use std::future::Future;
use std::time::Duration;

use portal_core::error::{PortalError, PortalResult};

/// Run a store call, failing with [`PortalError::Timeout`] if it does
/// not finish within `limit`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    operation: &str,
    call: impl Future<Output = PortalResult<T>>,
) -> PortalResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortalError::Timeout(format!(
            "{operation} exceeded {}ms",
            limit.as_millis()
        ))),
    }
}
