//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::{debug, info};

use crate::cache::{BoundedCache, FileChunkCache, SearchResultCache};
use crate::config::Config;
use crate::error::{LogscopeError, Result};
use crate::models::{
    ClearResponse, HealthResponse, InvalidateRequest, InvalidateResponse, StatsResponse,
};
use crate::watcher::{ChangeWatcher, WatchId};

/// Application state shared across all handlers.
///
/// The caches are internally synchronized, so handlers never take a lock here.
#[derive(Clone)]
pub struct AppState {
    pub search: SearchResultCache,
    pub chunks: FileChunkCache,
    pub watcher: Arc<ChangeWatcher>,
}

impl AppState {
    /// Creates a new AppState from already-built parts.
    pub fn new(search: SearchResultCache, chunks: FileChunkCache, watcher: Arc<ChangeWatcher>) -> Self {
        Self {
            search,
            chunks,
            watcher,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Sweepers are not started; see [`AppState::start_sweepers`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let search = SearchResultCache::new(
            Arc::new(BoundedCache::new(config.search_cache.clone())),
            config.search_ttl,
            config.search_max_results,
        );
        let chunks = FileChunkCache::new(
            Arc::new(BoundedCache::new(config.chunk_cache.clone())),
            config.chunk_ttl,
            config.chunk_max_size,
        );
        let watcher = Arc::new(ChangeWatcher::new()?);
        Ok(Self::new(search, chunks, watcher))
    }

    /// Starts the expiry sweep of both caches. Must run inside a tokio runtime.
    pub fn start_sweepers(&self) -> bool {
        let search = self.search.storage().start_sweeper();
        let chunks = self.chunks.storage().start_sweeper();
        search && chunks
    }

    /// Stops the watcher and both sweepers.
    pub fn shutdown(&self) {
        self.watcher.stop();
        self.search.storage().stop();
        self.chunks.storage().stop();
    }

    /// Drops everything cached for `path` in both caches.
    ///
    /// Entries keyed by the path as given and by its resolved form are both
    /// removed. Returns (search results, chunks) removed. Blocks on
    /// filesystem access; async callers run it on a blocking thread.
    pub fn invalidate(&self, path: &Path) -> (usize, usize) {
        let mut removed = (
            self.search.invalidate_file(path),
            self.chunks.invalidate_file(path),
        );

        if let Ok(resolved) = std::fs::canonicalize(path) {
            if resolved != path {
                removed.0 += self.search.invalidate_file(&resolved);
                removed.1 += self.chunks.invalidate_file(&resolved);
            }
        }
        removed
    }

    /// Subscribes to changes of `path` so both caches drop its entries on
    /// every change.
    pub fn watch_log(&self, path: impl Into<PathBuf>) -> Result<WatchId> {
        let path = path.into();
        let state = self.clone_caches();
        let configured = path.clone();

        self.watcher.watch_file(&path, move |event| {
            let (search, chunks) = state.invalidate_both(&configured, &event.path);
            debug!(
                "{} {}: dropped {} search results and {} chunks",
                event.path.display(),
                event.kind,
                search,
                chunks
            );
        })
    }

    fn clone_caches(&self) -> CachePair {
        CachePair {
            search: self.search.clone(),
            chunks: self.chunks.clone(),
        }
    }
}

/// The two caches, without the watcher, so a callback does not keep the
/// watcher alive.
struct CachePair {
    search: SearchResultCache,
    chunks: FileChunkCache,
}

impl CachePair {
    fn invalidate_both(&self, configured: &Path, resolved: &Path) -> (usize, usize) {
        let mut search = self.search.invalidate_file(resolved);
        let mut chunks = self.chunks.invalidate_file(resolved);
        if configured != resolved {
            search += self.search.invalidate_file(configured);
            chunks += self.chunks.invalidate_file(configured);
        }
        (search, chunks)
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.watcher.is_running()))
}

/// Handler for GET /stats
///
/// Returns snapshots of both caches and the number of watched files.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.search.stats(),
        state.chunks.stats(),
        state.watcher.watched_paths().len(),
    ))
}

/// Handler for POST /invalidate
///
/// Drops cached search results and chunks of one file.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(LogscopeError::InvalidRequest(error_msg));
    }

    // Path resolution touches the filesystem; keep it off the async workers
    let path = req.path_buf();
    let (search_removed, chunks_removed) = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || state.invalidate(&path))
            .await
            .map_err(|err| LogscopeError::Internal(format!("invalidation task failed: {}", err)))?
    };
    info!(
        "Invalidated {}: {} search results, {} chunks",
        path.display(),
        search_removed,
        chunks_removed
    );

    Ok(Json(InvalidateResponse::new(
        req.path.trim(),
        search_removed,
        chunks_removed,
    )))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.search.clear();
    state.chunks.clear();
    info!("All caches cleared");

    Json(ClearResponse::cleared())
}
