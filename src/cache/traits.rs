//! Cache trait definitions
//!
//! The minimal key/value contract shared by every cache tier, so tiers can be
//! composed without knowing each other's storage.

use crate::cache::{BoundedCache, SizeEstimate};

/// Key/value cache operations. None of them can fail.
pub trait Cache<V>: Send + Sync {
    /// Returns the live value for `key`, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: V);

    /// Removes `key`; no-op when absent.
    fn delete(&self, key: &str);

    /// Removes every entry.
    fn clear(&self);
}

impl<V> Cache<V> for BoundedCache<V>
where
    V: Clone + SizeEstimate + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        BoundedCache::get(self, key)
    }

    fn set(&self, key: &str, value: V) {
        BoundedCache::set(self, key, value)
    }

    fn delete(&self, key: &str) {
        BoundedCache::delete(self, key)
    }

    fn clear(&self) {
        BoundedCache::clear(self)
    }
}
