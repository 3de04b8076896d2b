//! File change watcher
//!
//! Wraps one OS notification backend and fans each notification out to the
//! callbacks registered for the notified path. A single dispatch thread
//! invokes callbacks synchronously, so for any path every subscriber sees
//! events in the order the OS reported them, and in registration order within
//! one event. A slow callback therefore delays every other delivery; callers
//! that need concurrency hand work off from inside their callback.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{LogscopeError, Result};
use crate::watcher::event::classify;
use crate::watcher::registry::{Callback, FileIdentity, Registry, WatchId};
use crate::watcher::{ChangeKind, FileChangeEvent};

/// Messages consumed by the dispatch loop.
enum Signal {
    Raw(notify::Result<Event>),
    Stop,
}

/// State shared between the public handle and the dispatch thread.
struct Shared {
    registry: RwLock<Registry>,
    backend: Mutex<RecommendedWatcher>,
    /// Parked here while the dispatch loop is not running
    receiver: Mutex<Option<Receiver<Signal>>>,
    running: AtomicBool,
}

impl Shared {
    fn dispatch(&self, raw: &Event) {
        for change in classify(raw) {
            // The OS drops its watch with the file; a later watch_file must reinstall it
            if change.kind == ChangeKind::Deleted {
                let current = FileIdentity::of(&change.path);
                self.registry.write().disarm(&change.path, current);
            }

            // Clone the list so callbacks run without the registry lock
            let callbacks = self.registry.read().callbacks_for(&change.path);
            if callbacks.is_empty() {
                continue;
            }

            debug!(
                "Dispatching {} for {} to {} subscribers",
                change.kind,
                change.path.display(),
                callbacks.len()
            );
            for callback in callbacks {
                invoke(&callback, &change);
            }
        }
    }

    fn unwatch_backend(&self, path: &Path) {
        if let Err(err) = self.backend.lock().unwatch(path) {
            debug!("Removing OS watch for {}: {}", path.display(), err);
        }
    }
}

fn invoke(callback: &Callback, change: &FileChangeEvent) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(change))).is_err() {
        error!(
            "Subscriber panicked handling {} for {}",
            change.kind,
            change.path.display()
        );
    }
}

fn dispatch_loop(shared: Arc<Shared>, receiver: Receiver<Signal>) {
    while let Ok(signal) = receiver.recv() {
        match signal {
            Signal::Stop => break,
            Signal::Raw(Ok(event)) => shared.dispatch(&event),
            Signal::Raw(Err(err)) => warn!("File watcher error: {}", err),
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }
    }

    *shared.receiver.lock() = Some(receiver);
    debug!("Watch dispatch loop exited");
}

/// Resolves `path` to an absolute path, following symlinks when it exists.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Ok(canonical);
    }
    std::path::absolute(path).map_err(|source| LogscopeError::ResolvePath {
        path: path.to_path_buf(),
        source,
    })
}

// == Change Watcher ==
/// Multiplexes OS file change notifications to per-path subscribers.
pub struct ChangeWatcher {
    shared: Arc<Shared>,
    sender: Sender<Signal>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeWatcher {
    /// Creates a stopped watcher with its OS backend.
    pub fn new() -> Result<Self> {
        let (sender, receiver) = mpsc::channel();

        let raw_sender = sender.clone();
        let backend = notify::recommended_watcher(move |res| {
            let _ = raw_sender.send(Signal::Raw(res));
        })
        .map_err(LogscopeError::Backend)?;

        Ok(Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(Registry::default()),
                backend: Mutex::new(backend),
                receiver: Mutex::new(Some(receiver)),
                running: AtomicBool::new(false),
            }),
            sender,
            dispatcher: Mutex::new(None),
        })
    }

    // == Start ==
    /// Starts the dispatch loop.
    ///
    /// Notifications that arrived while stopped are discarded.
    pub fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return Err(LogscopeError::AlreadyRunning);
        }

        // Still held by a loop that was stopped from inside a callback and has not exited
        let receiver = self
            .shared
            .receiver
            .lock()
            .take()
            .ok_or(LogscopeError::AlreadyRunning)?;
        while receiver.try_recv().is_ok() {}

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("logscope-watch".to_string())
            .spawn(move || dispatch_loop(shared, receiver))
            .map_err(|err| {
                self.shared.running.store(false, Ordering::Release);
                LogscopeError::Internal(format!("cannot spawn dispatch thread: {}", err))
            })?;

        *dispatcher = Some(handle);
        info!("Change watcher started");
        Ok(())
    }

    // == Stop ==
    /// Stops the dispatch loop and clears every registration.
    ///
    /// An event being dispatched completes first. Safe to call repeatedly,
    /// from any thread, including from inside a callback.
    pub fn stop(&self) {
        let Some(handle) = self.dispatcher.lock().take() else {
            return;
        };

        self.shared.running.store(false, Ordering::Release);
        let _ = self.sender.send(Signal::Stop);
        if handle.thread().id() != thread::current().id() && handle.join().is_err() {
            error!("Watch dispatch thread panicked");
        }

        let paths = self.shared.registry.write().clear();
        for path in &paths {
            self.shared.unwatch_backend(path);
        }
        info!("Change watcher stopped, {} paths released", paths.len());
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    // == Watch File ==
    /// Subscribes `callback` to changes of `path`.
    ///
    /// The OS watch is installed by the first subscription, and again whenever
    /// the previous one died with its file (deletion, rotation). If
    /// installation fails nothing is registered and the error is returned.
    pub fn watch_file<F>(&self, path: impl AsRef<Path>, callback: F) -> Result<WatchId>
    where
        F: Fn(&FileChangeEvent) + Send + Sync + 'static,
    {
        let path = resolve_path(path.as_ref())?;
        let identity = FileIdentity::of(&path);
        let mut registry = self.shared.registry.write();

        let install = registry.needs_install(&path, identity);
        if install {
            self.shared
                .backend
                .lock()
                .watch(&path, RecursiveMode::NonRecursive)
                .map_err(|source| LogscopeError::Watch {
                    path: path.clone(),
                    source,
                })?;
            debug!("Installed OS watch for {}", path.display());
        }

        let id = registry.add(path.clone(), Arc::new(callback));
        if install {
            registry.arm(&path, identity);
        }
        Ok(id)
    }

    // == Unwatch File ==
    /// Removes every subscription for `path` and its OS watch.
    ///
    /// Returns false if the path was not watched.
    pub fn unwatch_file(&self, path: impl AsRef<Path>) -> bool {
        let Ok(path) = resolve_path(path.as_ref()) else {
            return false;
        };

        let mut registry = self.shared.registry.write();
        let armed = registry.is_armed(&path);
        if !registry.remove_path(&path) {
            return false;
        }
        if armed {
            self.shared.unwatch_backend(&path);
        }
        debug!("Removed all subscriptions for {}", path.display());
        true
    }

    // == Unwatch ==
    /// Removes one subscription. The OS watch goes with the path's last one.
    pub fn unwatch(&self, id: WatchId) -> bool {
        let mut registry = self.shared.registry.write();
        let armed = registry
            .path_of(id)
            .is_some_and(|path| registry.is_armed(path));
        match registry.remove_id(id) {
            Some((path, true)) => {
                if armed {
                    self.shared.unwatch_backend(&path);
                }
                true
            }
            Some((_, false)) => true,
            None => false,
        }
    }

    /// Paths with at least one subscriber.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.shared.registry.read().paths()
    }

    pub fn subscriber_count(&self, path: impl AsRef<Path>) -> usize {
        match resolve_path(path.as_ref()) {
            Ok(path) => self.shared.registry.read().subscriber_count(&path),
            Err(_) => 0,
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
