//! photomatch Server - REST API for perceptual-hash match review
//!
//! Exposes photomatch-core via HTTP endpoints:
//! - GET /api/match[/{offset}] - Next review task
//! - POST /api/match/commit - Confirm a match, "no match", or rematch
//! - POST /api/match/skip - Skip an item

use std::time::Duration;

use photomatch_server::{create_router_with_config, store, AppState, Config};
use tracing_subscriber::EnvFilter;

/// Interval between sweeps of expired candidate cache entries
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("photomatch_server=info,photomatch_core=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        threshold = config.hamming_threshold,
        rematch_resets_state = config.rematch_resets_state,
        cache_timeout_secs = config.cache_timeout_secs,
        "Configuration loaded"
    );

    let store = store::connect(&config).await?;
    let state = AppState::new(store, &config);

    if let Some(cache) = state.cache.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                cache.cleanup_expired();
            }
        });
    }

    let app = create_router_with_config(&config, state);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("photomatch server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
