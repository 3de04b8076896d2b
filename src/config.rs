//! Configuration Module
//!
//! Handles loading and managing cache and daemon configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sysinfo::System;

/// Fraction of total system memory used as a cache budget when none is configured.
pub const DEFAULT_MEMORY_FRACTION: f64 = 0.1;

/// Budget used when system memory cannot be read.
const FALLBACK_MEMORY_BUDGET: usize = 256 * 1024 * 1024;

/// Construction parameters for a single [`BoundedCache`](crate::cache::BoundedCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries, 0 = unbounded by count
    pub max_entries: usize,
    /// Time-to-live applied to every entry of the instance
    pub ttl: Duration,
    /// Memory budget in bytes, 0 = derive from system memory
    pub max_memory_bytes: usize,
    /// Utilization fraction above which an early reclamation pass is requested
    pub gc_threshold: f64,
    /// Interval between background expiry sweeps
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a config with the given count limit and TTL, other fields defaulted.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            ..Self::default()
        }
    }

    /// Sets an explicit memory budget in bytes.
    pub fn with_max_memory(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Sets the background sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the memory-pressure threshold.
    pub fn with_gc_threshold(mut self, threshold: f64) -> Self {
        self.gc_threshold = threshold;
        self
    }

    /// Returns the effective memory budget.
    ///
    /// An explicit budget wins; otherwise a fraction of total system memory is used.
    pub fn memory_budget(&self) -> usize {
        if self.max_memory_bytes > 0 {
            return self.max_memory_bytes;
        }

        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            FALLBACK_MEMORY_BUDGET
        } else {
            (total as f64 * DEFAULT_MEMORY_FRACTION) as usize
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(300),
            max_memory_bytes: 0,
            gc_threshold: 0.8,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Daemon configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage parameters of the search-result cache
    pub search_cache: CacheConfig,
    /// Maximum number of entries kept per cached search result
    pub search_max_results: usize,
    /// Logical lifetime of a cached search result
    pub search_ttl: Duration,
    /// Storage parameters of the file-chunk cache
    pub chunk_cache: CacheConfig,
    /// Chunks larger than this are never cached
    pub chunk_max_size: usize,
    /// Logical lifetime of a cached chunk
    pub chunk_ttl: Duration,
    /// Admin HTTP port
    pub server_port: u16,
    /// Files to watch for changes at startup
    pub watch_paths: Vec<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum entries per cache (default: 1000)
    /// - `CACHE_TTL` - Entry TTL in seconds (default: 300)
    /// - `CACHE_MAX_MEMORY` - Memory budget per cache in bytes (default: 0, derived)
    /// - `CACHE_GC_THRESHOLD` - Memory-pressure fraction (default: 0.8)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `SEARCH_MAX_RESULTS` - Entries kept per search result (default: 10000)
    /// - `SEARCH_TTL` - Search result lifetime in seconds (default: 300)
    /// - `CHUNK_MAX_SIZE` - Largest cacheable chunk in bytes (default: 1 MiB)
    /// - `CHUNK_TTL` - Chunk lifetime in seconds (default: 300)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `WATCH_PATHS` - Comma-separated files to watch (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache = CacheConfig {
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.search_cache.max_entries),
            ttl: Duration::from_secs(env_or("CACHE_TTL", 300)),
            max_memory_bytes: env_or("CACHE_MAX_MEMORY", 0),
            gc_threshold: env_or("CACHE_GC_THRESHOLD", defaults.search_cache.gc_threshold),
            sweep_interval: Duration::from_secs(env_or("CACHE_SWEEP_INTERVAL", 60)),
        };

        let watch_paths = env::var("WATCH_PATHS")
            .map(|v| parse_path_list(&v))
            .unwrap_or_default();

        Self {
            search_cache: cache.clone(),
            search_max_results: env_or("SEARCH_MAX_RESULTS", defaults.search_max_results),
            search_ttl: Duration::from_secs(env_or("SEARCH_TTL", 300)),
            chunk_cache: cache,
            chunk_max_size: env_or("CHUNK_MAX_SIZE", defaults.chunk_max_size),
            chunk_ttl: Duration::from_secs(env_or("CHUNK_TTL", 300)),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            watch_paths,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_cache: CacheConfig::default(),
            search_max_results: 10_000,
            search_ttl: Duration::from_secs(300),
            chunk_cache: CacheConfig::default(),
            chunk_max_size: 1024 * 1024,
            chunk_ttl: Duration::from_secs(300),
            server_port: 3000,
            watch_paths: Vec::new(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
