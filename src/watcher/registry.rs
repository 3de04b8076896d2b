//! Subscription registry: absolute path to the ordered callbacks watching it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::watcher::FileChangeEvent;

/// Subscriber callback. Calls for one path are ordered and never overlap.
pub type Callback = Arc<dyn Fn(&FileChangeEvent) + Send + Sync>;

/// Handle for one subscription, returned by `watch_file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Identity of the file a watch was installed on.
///
/// A path recreated after deletion is a different file and needs a new watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn of(path: &Path) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_path: &Path) -> Option<Self> {
        None
    }
}

struct Subscription {
    id: WatchId,
    callback: Callback,
}

#[derive(Default)]
struct WatchedPath {
    subs: Vec<Subscription>,
    /// The OS watch is believed live
    armed: bool,
    identity: Option<FileIdentity>,
}

#[derive(Default)]
pub(crate) struct Registry {
    paths: HashMap<PathBuf, WatchedPath>,
    next_id: u64,
}

impl Registry {
    /// True when `path` has no live OS watch on the file now at `identity`.
    pub fn needs_install(&self, path: &Path, identity: Option<FileIdentity>) -> bool {
        match self.paths.get(path) {
            None => true,
            Some(watched) => !watched.armed || watched.identity != identity,
        }
    }

    /// Records that a live OS watch now covers the file at `identity`.
    pub fn arm(&mut self, path: &Path, identity: Option<FileIdentity>) {
        if let Some(watched) = self.paths.get_mut(path) {
            watched.armed = true;
            watched.identity = identity;
        }
    }

    /// Records that the OS dropped its watch, as it does when the file is
    /// deleted, unless the watch was already reinstalled on the file now at
    /// `current`.
    pub fn disarm(&mut self, path: &Path, current: Option<FileIdentity>) {
        if let Some(watched) = self.paths.get_mut(path) {
            if current.is_none() || watched.identity != current {
                watched.armed = false;
            }
        }
    }

    pub fn is_armed(&self, path: &Path) -> bool {
        self.paths.get(path).is_some_and(|watched| watched.armed)
    }

    /// Appends a callback after any existing ones for `path`.
    pub fn add(&mut self, path: PathBuf, callback: Callback) -> WatchId {
        self.next_id += 1;
        let id = WatchId(self.next_id);
        self.paths
            .entry(path)
            .or_default()
            .subs
            .push(Subscription { id, callback });
        id
    }

    /// Drops every callback for `path`; returns whether any existed.
    pub fn remove_path(&mut self, path: &Path) -> bool {
        self.paths.remove(path).is_some()
    }

    /// Path the subscription `id` belongs to.
    pub fn path_of(&self, id: WatchId) -> Option<&Path> {
        self.paths
            .iter()
            .find(|(_, watched)| watched.subs.iter().any(|s| s.id == id))
            .map(|(path, _)| path.as_path())
    }

    /// Drops one subscription. Returns its path and whether it was the last one.
    pub fn remove_id(&mut self, id: WatchId) -> Option<(PathBuf, bool)> {
        let path = self.path_of(id)?.to_path_buf();

        let subs = &mut self.paths.get_mut(&path)?.subs;
        subs.retain(|s| s.id != id);
        let last = subs.is_empty();
        if last {
            self.paths.remove(&path);
        }
        Some((path, last))
    }

    /// Callbacks for `path` in registration order.
    pub fn callbacks_for(&self, path: &Path) -> Vec<Callback> {
        self.paths
            .get(path)
            .map(|watched| watched.subs.iter().map(|s| Arc::clone(&s.callback)).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, path: &Path) -> usize {
        self.paths.get(path).map_or(0, |watched| watched.subs.len())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.keys().cloned().collect()
    }

    /// Empties the registry, returning the paths that were watched.
    pub fn clear(&mut self) -> Vec<PathBuf> {
        self.paths.drain().map(|(path, _)| path).collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.paths.iter().map(|(path, watched)| (path, watched.subs.len())))
            .finish()
    }
}
