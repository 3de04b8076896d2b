//! Search Result Cache Module
//!
//! Caches search results keyed by a hash of the full, normalized query.
//! Each stored result carries its own expiry on top of the underlying
//! cache's TTL, since the two lifetimes are configured independently.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{BoundedCache, CacheStats, SizeEstimate};

/// Fixed per-line overhead charged on top of a log entry's text.
const LOG_ENTRY_OVERHEAD: usize = 64;

// == Log Entry ==
/// One matched log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 1-based line number in the file
    pub line_number: u64,
    /// Byte offset of the line start
    pub offset: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<String>,
    pub message: String,
}

impl SizeEstimate for LogEntry {
    fn estimated_size(&self) -> usize {
        LOG_ENTRY_OVERHEAD + self.message.len() + self.level.estimated_size()
    }
}

// == Search Result ==
/// Outcome of one search execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched entries, possibly capped
    pub entries: Vec<LogEntry>,
    /// Matches found before any cap was applied
    pub total_matches: usize,
    /// True when `entries` holds fewer lines than were matched
    pub truncated: bool,
}

impl SizeEstimate for SearchResult {
    fn estimated_size(&self) -> usize {
        self.entries.estimated_size()
    }
}

// == Search Query ==
/// Everything that determines the outcome of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// File being searched
    pub path: PathBuf,
    /// Search text or pattern
    pub text: String,
    /// Whether `text` is a regular expression
    pub is_regex: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Accepted levels, empty = all
    pub levels: Vec<String>,
    /// Pagination offset
    pub offset: usize,
    /// Pagination limit
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn regex(mut self, is_regex: bool) -> Self {
        self.is_regex = is_regex;
        self
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.levels = levels.into_iter().map(Into::into).collect();
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    // == Cache Key ==
    /// Deterministic SHA-256 key over every field of the query.
    ///
    /// Level filters are compared case-insensitively and regardless of order.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.path.as_os_str().as_encoded_bytes());
        hasher.update([0]);
        hasher.update(self.text.as_bytes());
        hasher.update([0, self.is_regex as u8]);
        for bound in [self.start_time, self.end_time] {
            match bound {
                Some(t) => hasher.update(t.timestamp_micros().to_le_bytes()),
                None => hasher.update([0xff; 8]),
            }
            hasher.update([1]);
        }
        for level in &self.normalized_levels() {
            hasher.update(level.as_bytes());
            hasher.update([0]);
        }
        hasher.update((self.offset as u64).to_le_bytes());
        hasher.update((self.limit as u64).to_le_bytes());

        format!("search:{:x}", hasher.finalize())
    }

    fn normalized_levels(&self) -> Vec<String> {
        let mut levels: Vec<String> = self.levels.iter().map(|l| l.to_lowercase()).collect();
        levels.sort();
        levels.dedup();
        levels
    }

    /// True when both queries produce the same result, i.e. share a cache key.
    pub fn same_search(&self, other: &SearchQuery) -> bool {
        self.path == other.path
            && self.text == other.text
            && self.is_regex == other.is_regex
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.offset == other.offset
            && self.limit == other.limit
            && self.normalized_levels() == other.normalized_levels()
    }
}

// == Cached Search Result ==
/// Stored wrapper: the result, its own expiry, and the query that produced it.
#[derive(Debug, Clone)]
pub struct CachedSearchResult {
    pub result: Arc<SearchResult>,
    pub expires_at: Instant,
    pub query: SearchQuery,
}

impl SizeEstimate for CachedSearchResult {
    fn estimated_size(&self) -> usize {
        self.result.estimated_size() + self.query.text.len()
    }
}

// == Search Result Cache ==
/// Search-result cache over an injected, possibly shared [`BoundedCache`].
///
/// Invalidation is precise: [`invalidate_file`](Self::invalidate_file) drops
/// exactly the results whose query targeted the file.
#[derive(Debug, Clone)]
pub struct SearchResultCache {
    cache: Arc<BoundedCache<CachedSearchResult>>,
    ttl: Duration,
    max_results: usize,
}

impl SearchResultCache {
    /// # Arguments
    /// * `cache` - Storage, may be shared with other consumers
    /// * `ttl` - Logical lifetime of a cached result
    /// * `max_results` - Entries kept per result; larger results are truncated
    pub fn new(cache: Arc<BoundedCache<CachedSearchResult>>, ttl: Duration, max_results: usize) -> Self {
        Self {
            cache,
            ttl,
            max_results,
        }
    }

    // == Get ==
    /// Returns the cached result for `query` unless missing or expired.
    ///
    /// A stored result past its own expiry, or produced by a different query,
    /// is dropped and counted as a miss.
    pub fn get(&self, query: &SearchQuery) -> Option<Arc<SearchResult>> {
        let now = Instant::now();
        self.cache
            .get_valid(&query.cache_key(), |cached| {
                now < cached.expires_at && cached.query.same_search(query)
            })
            .map(|cached| cached.result)
    }

    // == Set ==
    /// Stores `result` for `query`, capping its entries at `max_results`.
    pub fn set(&self, query: &SearchQuery, mut result: SearchResult) {
        if result.entries.len() > self.max_results {
            debug!(
                "Truncating search result for {} from {} to {} entries",
                query.path.display(),
                result.entries.len(),
                self.max_results
            );
            result.entries.truncate(self.max_results);
            result.truncated = true;
        }

        let cached = CachedSearchResult {
            result: Arc::new(result),
            expires_at: Instant::now() + self.ttl,
            query: query.clone(),
        };
        self.cache.set(query.cache_key(), cached);
    }

    // == Invalidate File ==
    /// Drops every cached result produced by a query on `path`.
    ///
    /// Returns the number of results removed.
    pub fn invalidate_file(&self, path: &Path) -> usize {
        let removed = self.cache.remove_where(|_, cached| cached.query.path.as_path() == path);
        if removed > 0 {
            debug!("Invalidated {} search results for {}", removed, path.display());
        }
        removed
    }

    /// Removes every entry of the underlying cache.
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<BoundedCache<CachedSearchResult>> {
        &self.cache
    }
}
