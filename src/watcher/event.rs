//! Change events delivered to subscribers, and their classification from
//! raw OS notifications.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use serde::Serialize;

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    /// Content write or permission change
    Modified,
    /// Removal, or rename away from the path
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// One change to one file. Delivered to every subscriber of the path, then dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChangeEvent {
    /// Absolute path of the file
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub observed_at: DateTime<Utc>,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at: Utc::now(),
        }
    }
}

/// Maps a raw notification to per-path change events.
///
/// Access notifications and kinds that carry no change are dropped. A rename
/// reported with both ends deletes the old path and creates the new one.
pub fn classify(event: &Event) -> Vec<FileChangeEvent> {
    let uniform = |kind: ChangeKind| -> Vec<FileChangeEvent> {
        event
            .paths
            .iter()
            .map(|path| FileChangeEvent::new(path.clone(), kind))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => uniform(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => uniform(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let kind = if i == 0 {
                    ChangeKind::Deleted
                } else {
                    ChangeKind::Created
                };
                FileChangeEvent::new(path.clone(), kind)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => uniform(ChangeKind::Deleted),
        EventKind::Modify(_) => uniform(ChangeKind::Modified),
        EventKind::Remove(_) => uniform(ChangeKind::Deleted),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
