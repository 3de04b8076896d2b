//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.
//! Counters are atomic so they can be updated and read without the entry lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use sysinfo::System;

// == Stats Counters ==
/// Monotonic counters owned by a cache instance.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCounters {
    // == Constructor ==
    /// Creates counters all at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `count` expired entries removed by lookup or sweep.
    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }
}

// == Memory Usage ==
/// System memory figures read at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    /// Used system memory in bytes
    pub used_bytes: u64,
    /// Total system memory in bytes
    pub total_bytes: u64,
}

impl MemoryUsage {
    /// Reads current memory figures from the operating system.
    pub fn current() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            used_bytes: system.used_memory(),
            total_bytes: system.total_memory(),
        }
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of a cache's performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of live entries removed to satisfy capacity or memory limits
    pub evictions: u64,
    /// Number of expired entries removed by lookup or sweep
    pub expirations: u64,
    /// hits / (hits + misses), 0 when no lookups happened yet
    pub hit_ratio: f64,
    /// Current number of entries in the cache
    pub item_count: usize,
    /// Sum of estimated entry sizes
    pub current_size_bytes: usize,
    /// Memory budget of the cache
    pub max_size_bytes: usize,
    /// Count limit of the cache, 0 = unbounded
    pub max_entries: usize,
    /// System memory at snapshot time
    pub memory: MemoryUsage,
}

impl CacheStats {
    /// Builds a snapshot from live counters and point-in-time figures.
    pub fn snapshot(
        counters: &StatsCounters,
        item_count: usize,
        current_size_bytes: usize,
        max_size_bytes: usize,
        max_entries: usize,
    ) -> Self {
        let hits = counters.hits();
        let misses = counters.misses();
        Self {
            hits,
            misses,
            evictions: counters.evictions(),
            expirations: counters.expirations(),
            hit_ratio: hit_ratio(hits, misses),
            item_count,
            current_size_bytes,
            max_size_bytes,
            max_entries,
            memory: MemoryUsage::current(),
        }
    }
}

// == Hit Ratio ==
/// Returns hits / (hits + misses), or 0.0 if no requests have been made.
pub fn hit_ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = StatsCounters::new();
        assert_eq!(counters.hits(), 0);
        assert_eq!(counters.misses(), 0);
        assert_eq!(counters.evictions(), 0);
        assert_eq!(counters.expirations(), 0);
    }

    #[test]
    fn test_hit_ratio_no_requests() {
        assert_eq!(hit_ratio(0, 0), 0.0);
    }

    #[test]
    fn test_hit_ratio_mixed() {
        let counters = StatsCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();

        let stats = CacheStats::snapshot(&counters, 1, 10, 100, 0);
        assert_eq!(stats.hit_ratio, 0.75);
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.current_size_bytes, 10);
    }

    #[test]
    fn test_record_eviction_and_expiration() {
        let counters = StatsCounters::new();
        counters.record_eviction();
        counters.record_eviction();
        counters.record_expirations(3);
        assert_eq!(counters.evictions(), 2);
        assert_eq!(counters.expirations(), 3);
    }

    #[test]
    fn test_snapshot_reads_system_memory() {
        let stats = CacheStats::snapshot(&StatsCounters::new(), 0, 0, 0, 0);
        assert!(stats.memory.total_bytes >= stats.memory.used_bytes);
    }
}
