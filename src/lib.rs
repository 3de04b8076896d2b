//! Logscope - cache and file-change core of a local log inspection service
//!
//! Provides bounded in-memory caches for search results and file chunks, and
//! a file watcher that tells callers when to invalidate them.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod watcher;

pub use api::AppState;
pub use cache::{BoundedCache, Cache, FileChunkCache, SearchResultCache, TieredCache};
pub use config::{CacheConfig, Config};
pub use error::{LogscopeError, Result};
pub use watcher::{ChangeKind, ChangeWatcher, FileChangeEvent, WatchId};
