//! Eviction Policy Module
//!
//! Picks the entry to evict by a recency/frequency score rather than a strict
//! LRU order. A full scan per eviction keeps writes free of ordering upkeep;
//! eviction only runs when a cache is over budget.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Candidate ==
/// Scoring snapshot of one entry.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    access_count: u64,
    last_access_us: u64,
}

impl Candidate {
    fn of<V>(entry: &CacheEntry<V>, now_us: u64) -> Self {
        Self {
            score: entry.eviction_score(now_us),
            access_count: entry.access_count(),
            last_access_us: entry.last_access_us(),
        }
    }

    /// Higher score loses; ties go to the less used, then the older entry.
    fn evicts_before(&self, other: &Candidate) -> bool {
        if self.score != other.score {
            return self.score > other.score;
        }
        if self.access_count != other.access_count {
            return self.access_count < other.access_count;
        }
        self.last_access_us < other.last_access_us
    }
}

// == Select Victim ==
/// Returns the key of the entry to evict, or None if `entries` is empty.
pub fn select_victim<V>(entries: &HashMap<String, CacheEntry<V>>, now_us: u64) -> Option<String> {
    let mut victim: Option<(&String, Candidate)> = None;

    for (key, entry) in entries {
        let candidate = Candidate::of(entry, now_us);
        match &victim {
            Some((_, best)) if !candidate.evicts_before(best) => {}
            _ => victim = Some((key, candidate)),
        }
    }

    victim.map(|(key, _)| key.clone())
}
