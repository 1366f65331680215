use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod analytics;
mod api;
mod camera;
mod config;
mod storage;

use api::AppState;
use config::Config;
use storage::SnapshotStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("camwatch=debug".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::info!(
        input = %config.source.input,
        interval_ms = config.analytics.sample_interval_ms,
        adaptive = config.analytics.adaptive_background,
        "loaded config"
    );

    let store = SnapshotStore::new();
    let reset_requested = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(AtomicBool::new(false));

    let server_handle = if config.http.enabled {
        let state = AppState::new(store.clone(), Arc::clone(&reset_requested));
        let port = config.http.port;
        Some(tokio::spawn(async move {
            if let Err(e) = api::start_server(state, port).await {
                tracing::error!("HTTP server failed: {}", e);
            }
        }))
    } else {
        None
    };

    let mut analyzer_handle = analytics::spawn_analyzer(
        config,
        store.clone(),
        reset_requested,
        Arc::clone(&shutdown),
    );

    tokio::select! {
        result = &mut analyzer_handle => {
            if let Err(e) = result {
                tracing::error!("analyzer task failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            shutdown.store(true, Ordering::Relaxed);
            let _ = analyzer_handle.await;
        }
    }

    let status = store.status();
    tracing::info!(
        cycles = status.cycles_processed,
        source_ended = status.source_ended,
        "final analyzer stats"
    );

    if let Some(handle) = server_handle {
        handle.abort();
    }
    tracing::info!("shutdown complete");

    Ok(())
}
