//! Logscope daemon
//!
//! Runs the search and chunk caches, keeps them consistent with the watched
//! log files, and serves the admin HTTP surface.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logscope::api::{create_router, AppState};
use logscope::Config;

/// Main entry point for the logscope daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create both caches and start their sweep tasks
/// 4. Start the change watcher and subscribe every configured log file
/// 5. Start the admin HTTP server on the configured port
/// 6. On SIGINT/SIGTERM stop the watcher and the sweepers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logscope=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting logscope");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, ttl={}s, sweep_interval={}s, port={}, watch_paths={}",
        config.search_cache.max_entries,
        config.search_cache.ttl.as_secs(),
        config.search_cache.sweep_interval.as_secs(),
        config.server_port,
        config.watch_paths.len()
    );

    let state = AppState::from_config(&config).context("creating file watcher")?;
    state.start_sweepers();
    info!(
        "Caches initialized: search budget={} bytes, chunk budget={} bytes",
        state.search.storage().max_memory(),
        state.chunks.storage().max_memory()
    );

    state.watcher.start().context("starting file watcher")?;
    for path in &config.watch_paths {
        match state.watch_log(path) {
            Ok(_) => info!("Watching {}", path.display()),
            Err(err) => warn!("Skipping {}: {}", path.display(), err),
        }
    }

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Admin server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving admin API")?;

    state.shutdown();
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
