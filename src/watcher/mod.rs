//! Watcher Module
//!
//! Per-file change notification built on `notify`.

mod change_watcher;
mod event;
mod registry;

pub use change_watcher::ChangeWatcher;
pub use event::{classify, ChangeKind, FileChangeEvent};
pub use registry::{Callback, WatchId};
