//! Bounded Cache Module
//!
//! Main cache engine: a HashMap of entries behind one read/write lock, with a
//! uniform TTL, a composite count + memory budget, and score-based eviction.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::cache::eviction::select_victim;
use crate::cache::{CacheEntry, CacheStats, SizeEstimate, StatsCounters};
use crate::config::CacheConfig;
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Entry Table ==
/// Entries plus the running size total, always mutated together.
struct Table<V> {
    map: HashMap<String, CacheEntry<V>>,
    current_bytes: usize,
}

impl<V> Table<V> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            current_bytes: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.map.remove(key)?;
        self.current_bytes = self.current_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn evict_one(&mut self, now_us: u64) -> Option<(String, usize)> {
        let key = select_victim(&self.map, now_us)?;
        let entry = self.remove(&key)?;
        Some((key, entry.size_bytes))
    }
}

// == Bounded Cache ==
/// Generic key/value cache with TTL expiry, count and memory limits, and
/// heuristic eviction.
///
/// Operations never fail and never block on I/O. A single instance may be
/// shared (behind an `Arc`) by several consumers; sequences of calls are not
/// atomic with respect to each other.
pub struct BoundedCache<V> {
    table: RwLock<Table<V>>,
    counters: StatsCounters,
    max_entries: usize,
    max_memory: usize,
    ttl: Duration,
    gc_threshold: f64,
    sweep_interval: Duration,
    epoch: Instant,
    pressure: Arc<Notify>,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl<V> BoundedCache<V> {
    // == Constructor ==
    /// Creates a cache from its configuration.
    ///
    /// The background sweep is not running until [`start_sweeper`](Self::start_sweeper).
    pub fn new(config: CacheConfig) -> Self {
        Self {
            table: RwLock::new(Table::new()),
            counters: StatsCounters::new(),
            max_entries: config.max_entries,
            max_memory: config.memory_budget(),
            ttl: config.ttl,
            gc_threshold: config.gc_threshold,
            sweep_interval: config.sweep_interval,
            epoch: Instant::now(),
            pressure: Arc::new(Notify::new()),
            sweeper: Mutex::new(None),
        }
    }

    fn micros_since_epoch(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_micros() as u64
    }

    // == Get ==
    /// Retrieves a clone of the value for `key`.
    ///
    /// An expired entry is removed on the spot and counted as a miss.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.get_valid(key, |_| true)
    }

    // == Get Valid ==
    /// Like [`get`](Self::get), but an entry whose value fails `is_valid` is
    /// treated as expired: removed, counted as an expiration and a miss.
    ///
    /// Lets wrappers with their own lifetime or identity checks keep the hit
    /// ratio honest.
    pub fn get_valid<F>(&self, key: &str, is_valid: F) -> Option<V>
    where
        V: Clone,
        F: Fn(&V) -> bool,
    {
        let now = Instant::now();
        let live = |entry: &CacheEntry<V>| !entry.is_expired_at(now) && is_valid(&entry.value);
        {
            let table = self.table.read();
            match table.map.get(key) {
                None => {
                    self.counters.record_miss();
                    return None;
                }
                Some(entry) if live(entry) => {
                    entry.touch(self.micros_since_epoch(now));
                    self.counters.record_hit();
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Lazy expiry; the entry may have been replaced since the read lock was dropped
        let mut table = self.table.write();
        if table.map.get(key).is_some_and(|e| !live(e)) {
            table.remove(key);
            self.counters.record_expirations(1);
        }
        self.counters.record_miss();
        None
    }

    // == Set ==
    /// Inserts or replaces the value for `key`, expiring one TTL from now.
    ///
    /// Other entries are evicted until the new one fits both limits. A value
    /// larger than the whole memory budget is not cached; any previous value
    /// for the key is still dropped.
    pub fn set(&self, key: impl Into<String>, value: V)
    where
        V: SizeEstimate,
    {
        let key = key.into();
        let size = value.estimated_size();
        let now = Instant::now();
        let now_us = self.micros_since_epoch(now);

        let utilization = {
            let mut table = self.table.write();
            table.remove(&key);

            if size > self.max_memory {
                debug!(
                    "Declined to cache '{}': {} bytes exceeds budget of {}",
                    key, size, self.max_memory
                );
                return;
            }

            while table.current_bytes + size > self.max_memory {
                match table.evict_one(now_us) {
                    Some(evicted) => self.note_eviction(evicted, "memory"),
                    None => break,
                }
            }

            if self.max_entries > 0 {
                while table.map.len() >= self.max_entries {
                    match table.evict_one(now_us) {
                        Some(evicted) => self.note_eviction(evicted, "count"),
                        None => break,
                    }
                }
            }

            table.current_bytes += size;
            table
                .map
                .insert(key, CacheEntry::new(value, self.ttl, size, now, now_us));
            table.current_bytes as f64 / self.max_memory as f64
        };

        if utilization > self.gc_threshold {
            self.pressure.notify_one();
        }
    }

    fn note_eviction(&self, (key, size): (String, usize), limit: &str) {
        self.counters.record_eviction();
        debug!("Evicted '{}' ({} bytes) over {} limit", key, size, limit);
    }

    // == Delete ==
    /// Removes the entry for `key` if present.
    pub fn delete(&self, key: &str) {
        self.table.write().remove(key);
    }

    // == Clear ==
    /// Removes every entry. Statistics counters are kept.
    pub fn clear(&self) {
        let mut table = self.table.write();
        table.map.clear();
        table.current_bytes = 0;
    }

    // == Remove Where ==
    /// Removes every entry for which `predicate` holds; returns how many.
    pub fn remove_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &V) -> bool,
    {
        let mut table = self.table.write();
        let doomed: Vec<String> = table
            .map
            .iter()
            .filter(|(key, entry)| predicate(key, &entry.value))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            table.remove(key);
        }
        doomed.len()
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut table = self.table.write();
        let expired: Vec<String> = table
            .map
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            table.remove(key);
        }
        self.counters.record_expirations(expired.len() as u64);
        expired.len()
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (item_count, current_bytes) = {
            let table = self.table.read();
            (table.map.len(), table.current_bytes)
        };
        CacheStats::snapshot(
            &self.counters,
            item_count,
            current_bytes,
            self.max_memory,
            self.max_entries,
        )
    }

    /// Checks for a live entry without touching it or the statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.table
            .read()
            .map
            .get(key)
            .is_some_and(|e| !e.is_expired_at(now))
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included until removed.
    pub fn len(&self) -> usize {
        self.table.read().map.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.table.read().map.is_empty()
    }

    /// Sum of estimated entry sizes.
    pub fn size_bytes(&self) -> usize {
        self.table.read().current_bytes
    }

    /// Effective memory budget in bytes.
    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Signal raised when utilization crosses the pressure threshold.
    pub(crate) fn pressure_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.pressure)
    }

    // == Stop ==
    /// Stops the background sweep. Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        if let Some(mut handle) = self.sweeper.lock().take() {
            handle.stop();
            debug!("Cache sweep stopped");
        }
    }

    /// Returns true while a background sweep is attached.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<V: Send + Sync + 'static> BoundedCache<V> {
    // == Start Sweeper ==
    /// Spawns the periodic expiry sweep on the current tokio runtime.
    ///
    /// Returns false when no runtime is available. Starting twice keeps the
    /// first sweep.
    pub fn start_sweeper(self: &Arc<Self>) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No tokio runtime available, cache sweep not started");
            return false;
        }

        let mut slot = self.sweeper.lock();
        if slot.is_none() {
            *slot = Some(spawn_sweep_task(self));
        }
        true
    }
}

impl<V> Drop for BoundedCache<V> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<V> fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("size_bytes", &self.size_bytes())
            .field("max_entries", &self.max_entries)
            .field("max_memory", &self.max_memory)
            .field("ttl", &self.ttl)
            .finish()
    }
}
