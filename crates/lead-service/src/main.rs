//! Lead Service
//!
//! REST API for lead management with role-based access control

use anyhow::{Context, Result};
use lead_service::{
    create_router, AppState, Backend, Config, LeadService, MemoryBackend, RedisStorage,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    let identity_header = config.identity_header_name()?;

    info!("Starting Lead Service");
    info!("Identity header: {}", identity_header);
    info!("Bootstrap admins: {}", config.admins.len());

    // Initialize storage
    let backend: Arc<dyn Backend> = match &config.redis_url {
        Some(redis_url) => Arc::new(
            RedisStorage::new(redis_url)
                .await
                .context("Failed to initialize storage")?,
        ),
        None => {
            warn!("REDIS_URL not set, leads will not survive a restart");
            Arc::new(MemoryBackend::new())
        }
    };

    let service = LeadService::open(backend, &config.admins)
        .await
        .context("Failed to open lead service")?;

    // Create application state
    let state = Arc::new(AppState {
        service,
        identity_header,
    });

    // Create router
    let app = create_router(Arc::clone(&state));

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&config.api_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_address()))?;

    info!("Lead Service running on http://{}", config.api_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.service.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
