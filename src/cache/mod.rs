//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, count and memory limits,
//! and score-based eviction, plus the specialized caches built on it.
//!
//! The caches never watch files themselves: callers invalidate entries when
//! the [`ChangeWatcher`](crate::watcher::ChangeWatcher) reports a change.

mod chunk;
mod entry;
mod eviction;
mod search;
mod size;
mod stats;
mod store;
mod tiered;
mod traits;


// Re-export public types
pub use chunk::{chunk_key, CachedFileChunk, FileChunkCache};
pub use entry::CacheEntry;
pub use search::{CachedSearchResult, LogEntry, SearchQuery, SearchResult, SearchResultCache};
pub use size::{SizeEstimate, DEFAULT_SIZE_ESTIMATE};
pub use stats::{hit_ratio, CacheStats, MemoryUsage, StatsCounters};
pub use store::BoundedCache;
pub use tiered::TieredCache;
pub use traits::Cache;
