//! Tiered Cache Module
//!
//! Two cache tiers behind one [`Cache`] interface: reads fall through from
//! `near` to `far` and promote far hits; writes go to both tiers.

use std::sync::Arc;

use tracing::debug;

use crate::cache::Cache;

/// Near tier plus optional far tier. Eviction is left to the tiers.
pub struct TieredCache<V> {
    near: Arc<dyn Cache<V>>,
    far: Option<Arc<dyn Cache<V>>>,
}

impl<V: Clone> TieredCache<V> {
    pub fn new(near: Arc<dyn Cache<V>>, far: Option<Arc<dyn Cache<V>>>) -> Self {
        Self { near, far }
    }

    /// Returns true when a far tier is configured.
    pub fn has_far(&self) -> bool {
        self.far.is_some()
    }
}

impl<V> Cache<V> for TieredCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.near.get(key) {
            return Some(value);
        }

        let value = self.far.as_ref()?.get(key)?;
        debug!("Promoting '{}' to near tier", key);
        self.near.set(key, value.clone());
        Some(value)
    }

    fn set(&self, key: &str, value: V) {
        if let Some(far) = &self.far {
            far.set(key, value.clone());
        }
        self.near.set(key, value);
    }

    fn delete(&self, key: &str) {
        self.near.delete(key);
        if let Some(far) = &self.far {
            far.delete(key);
        }
    }

    fn clear(&self) {
        self.near.clear();
        if let Some(far) = &self.far {
            far.clear();
        }
    }
}
