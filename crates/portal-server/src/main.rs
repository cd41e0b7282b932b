//! Portal Server: Application entry point.

use std::sync::Arc;

use portal_db::DbManager;
use portal_server::error::ServerError;
use portal_server::{PortalHandlers, ServerConfig, routes, telemetry};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PORTAL_CONFIG").ok());
    let config = ServerConfig::load(path.as_deref())?;

    telemetry::init(&config.log_filter);
    info!("Starting portal auth server...");

    config.validate()?;

    let db = DbManager::connect(&config.database).await?;
    portal_db::run_migrations(db.client()).await?;

    let handlers = Arc::new(PortalHandlers::from_db(db.client().clone(), &config));
    let app = routes::router(handlers);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app).await?;

    info!("Portal auth server stopped.");
    Ok(())
}
