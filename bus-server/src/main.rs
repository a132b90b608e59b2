use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use bus_server::cache::ViewCache;
use bus_server::config::{AppConfig, SourceConfig};
use bus_server::feed::{SnapshotSlot, spawn_feed};
use bus_server::pipeline::PipelineConfig;
use bus_server::store::{MockStore, StoreClient};
use bus_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bus_server=info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    let slot = SnapshotSlot::new();

    // Start the feed against the live store or the mock data file
    let feed = match &config.source {
        SourceConfig::Mock { path } => {
            tracing::info!(path = %path.display(), "using mock bus data");
            let store = MockStore::load(path)?;
            spawn_feed(Arc::new(store), slot.clone(), config.feed_config())
        }
        SourceConfig::Store { url, collection, .. } => {
            tracing::info!(%url, %collection, "using document store");
            let store_config = config
                .store_config()
                .ok_or("store configuration missing")?;
            let client = StoreClient::new(store_config)?;
            spawn_feed(Arc::new(client), slot.clone(), config.feed_config())
        }
    };

    let cache = ViewCache::new(&config.cache, PipelineConfig::default());
    let state = AppState::new(slot, feed.control(), cache);
    let app = create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Bus timetable listening on http://{}", config.bind_addr);
    tracing::info!("  GET  /              - Timetable page");
    tracing::info!("  GET  /buses         - Filtered timetable (JSON or HTML)");
    tracing::info!("  GET  /buses/stream  - Live timetable (server-sent events)");
    tracing::info!("  GET  /filters       - Filter options");
    tracing::info!("  GET  /feed/status   - Feed health");
    tracing::info!("  POST /feed/refresh  - Re-fetch bus data");

    // Stopping the feed closes the clock channel, which ends open SSE
    // streams so the graceful shutdown can complete.
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            feed.shutdown().await;
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
