//! EventHub
//!
//! Main application entry point

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use eventhub::{
    config::{Settings, StorageBackend},
    database::{create_pool, run_migrations, DatabaseService, EventStore, MemoryStore},
    handlers::{create_router, AppState},
    services::{HttpStatsClient, ServiceFactory, StatsClient},
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", eventhub::info());

    let store: Arc<dyn EventStore> = match settings.storage.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&settings.database).await?;
            if settings.storage.run_migrations {
                run_migrations(&pool).await?;
            }
            Arc::new(DatabaseService::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let stats: Arc<dyn StatsClient> = Arc::new(HttpStatsClient::new(&settings.stats)?);

    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, store, stats);
    let app = create_router(AppState::new(services));

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!(address = %address, "EventHub is listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("EventHub has been shut down.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
