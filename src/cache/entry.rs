//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single cache entry with value and metadata.
///
/// Access metadata is atomic so that hits can be recorded while the entry
/// table is only read-locked. Access times are microseconds since the owning
/// cache's epoch.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant after which the entry is logically absent
    pub expires_at: Instant,
    /// Estimated footprint charged against the memory budget
    pub size_bytes: usize,
    last_access_us: AtomicU64,
    access_count: AtomicU64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` after `now`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Lifetime of the entry
    /// * `size_bytes` - Estimated footprint of `value`
    /// * `now` - Current instant
    /// * `now_us` - Current time in microseconds since the cache epoch
    pub fn new(value: V, ttl: Duration, size_bytes: usize, now: Instant, now_us: u64) -> Self {
        Self {
            value,
            expires_at: now + ttl,
            size_bytes,
            last_access_us: AtomicU64::new(now_us),
            access_count: AtomicU64::new(0),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Checks if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&self, now_us: u64) {
        self.last_access_us.store(now_us, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of successful reads since insertion.
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Time of the last successful read (or insertion), in cache-epoch microseconds.
    pub fn last_access_us(&self) -> u64 {
        self.last_access_us.load(Ordering::Relaxed)
    }

    // == Eviction Score ==
    /// `seconds_since_last_access / (access_count + 1)`; higher scores are evicted first.
    pub fn eviction_score(&self, now_us: u64) -> f64 {
        let idle_us = now_us.saturating_sub(self.last_access_us());
        let idle_secs = idle_us as f64 / 1_000_000.0;
        idle_secs / (self.access_count() as f64 + 1.0)
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
