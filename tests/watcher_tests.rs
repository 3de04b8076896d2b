//! Integration Tests for the Change Watcher
//!
//! Exercises real OS notifications against files in temporary directories.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use logscope::{ChangeKind, ChangeWatcher, FileChangeEvent, LogscopeError};
use parking_lot::Mutex;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

// == Helper Functions ==

fn log_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "boot\n").unwrap();
    std::fs::canonicalize(&path).unwrap()
}

fn append(path: &Path, line: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(format!("{}\n", line).as_bytes()).unwrap();
}

fn started() -> ChangeWatcher {
    let watcher = ChangeWatcher::new().unwrap();
    watcher.start().unwrap();
    watcher
}

/// Waits for the first event of `kind`, skipping others.
fn wait_for(rx: &Receiver<FileChangeEvent>, kind: ChangeKind) -> FileChangeEvent {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = rx
            .recv_timeout(remaining)
            .unwrap_or_else(|_| panic!("no {} event within {:?}", kind, WAIT));
        if event.kind == kind {
            return event;
        }
    }
}

/// Asserts no further `kind` event for `path` arrives within `window`.
fn assert_no_more(rx: &Receiver<FileChangeEvent>, kind: ChangeKind, path: &Path, window: Duration) {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) => assert!(
                !(event.kind == kind && event.path == path),
                "unexpected second {} event for {}",
                kind,
                path.display()
            ),
            Err(_) => return,
        }
    }
}

// == Delivery ==

#[test]
fn test_append_delivers_modified() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();
    let (tx, rx) = mpsc::channel();

    watcher
        .watch_file(&file, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    append(&file, "request failed");

    let event = wait_for(&rx, ChangeKind::Modified);
    assert_eq!(event.path, file);
    assert_no_more(&rx, ChangeKind::Modified, &file, Duration::from_millis(500));
    watcher.stop();
}

#[test]
fn test_delete_delivers_deleted() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();
    let (tx, rx) = mpsc::channel();

    watcher
        .watch_file(&file, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    std::fs::remove_file(&file).unwrap();

    let event = wait_for(&rx, ChangeKind::Deleted);
    assert_eq!(event.path, file);
    watcher.stop();
}

#[test]
fn test_subscribers_called_in_registration_order() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();
    let order = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();

    let first = Arc::clone(&order);
    watcher
        .watch_file(&file, move |event| first.lock().push(("first", event.kind)))
        .unwrap();
    let second = Arc::clone(&order);
    watcher
        .watch_file(&file, move |event| {
            second.lock().push(("second", event.kind));
            let _ = tx.send(event.clone());
        })
        .unwrap();
    assert_eq!(watcher.subscriber_count(&file), 2);

    std::fs::remove_file(&file).unwrap();
    wait_for(&rx, ChangeKind::Deleted);
    watcher.stop();

    let order = order.lock();
    for pair in order.chunks(2) {
        assert_eq!(pair[0].0, "first");
        assert_eq!(pair[1].0, "second");
        assert_eq!(pair[0].1, pair[1].1);
    }
    assert!(order.iter().any(|(_, kind)| *kind == ChangeKind::Deleted));
}

#[test]
fn test_other_files_do_not_notify() {
    let dir = TempDir::new().unwrap();
    let watched = log_file(&dir, "watched.log");
    let other = log_file(&dir, "other.log");
    let watcher = started();
    let (tx, rx) = mpsc::channel();

    watcher
        .watch_file(&watched, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    append(&other, "noise");
    std::fs::remove_file(&watched).unwrap();

    let event = wait_for(&rx, ChangeKind::Deleted);
    assert_eq!(event.path, watched);
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.path, watched);
    }
}

#[test]
fn test_rewatch_after_recreate_delivers_events() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();
    let (old_tx, old_rx) = mpsc::channel();

    watcher
        .watch_file(&file, move |event| {
            let _ = old_tx.send(event.clone());
        })
        .unwrap();
    std::fs::remove_file(&file).unwrap();
    wait_for(&old_rx, ChangeKind::Deleted);

    // Rotation: the file comes back and the consumer subscribes again
    std::fs::write(&file, "restarted\n").unwrap();
    let (tx, rx) = mpsc::channel();
    watcher
        .watch_file(&file, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    assert_eq!(watcher.subscriber_count(&file), 2);

    append(&file, "after rotation");

    let event = wait_for(&rx, ChangeKind::Modified);
    assert_eq!(event.path, file);
    watcher.stop();
}

#[test]
fn test_rewatch_after_rename_rotation_delivers_events() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();

    watcher.watch_file(&file, |_| {}).unwrap();
    std::fs::rename(&file, dir.path().join("app.log.1")).unwrap();
    std::fs::write(&file, "fresh\n").unwrap();

    let (tx, rx) = mpsc::channel();
    watcher
        .watch_file(&file, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    append(&file, "after rotation");

    let event = wait_for(&rx, ChangeKind::Modified);
    assert_eq!(event.path, file);
    watcher.stop();
}

// == Registration ==

#[test]
fn test_missing_directory_fails_without_residue() {
    let dir = TempDir::new().unwrap();
    let watcher = started();
    let missing = dir.path().join("nope").join("app.log");

    let result = watcher.watch_file(&missing, |_| {});

    assert!(matches!(result, Err(LogscopeError::Watch { .. })));
    assert!(watcher.watched_paths().is_empty());

    let file = log_file(&dir, "app.log");
    watcher.watch_file(&file, |_| {}).unwrap();
    assert_eq!(watcher.watched_paths(), vec![file]);
}

#[test]
fn test_unwatch_unknown_path_is_false() {
    let dir = TempDir::new().unwrap();
    let watcher = started();

    assert!(!watcher.unwatch_file(dir.path().join("never.log")));
}

#[test]
fn test_unwatch_file_stops_delivery() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();
    let (tx, rx) = mpsc::channel();

    watcher
        .watch_file(&file, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();
    assert!(watcher.unwatch_file(&file));
    assert!(!watcher.unwatch_file(&file));

    std::fs::remove_file(&file).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_unwatch_id_keeps_remaining_subscribers() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();
    let (tx, rx) = mpsc::channel();

    let dropped = watcher.watch_file(&file, |_| panic!("unsubscribed")).unwrap();
    watcher
        .watch_file(&file, move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();

    assert!(watcher.unwatch(dropped));
    assert!(!watcher.unwatch(dropped));
    assert_eq!(watcher.subscriber_count(&file), 1);

    std::fs::remove_file(&file).unwrap();
    wait_for(&rx, ChangeKind::Deleted);
}

// == Lifecycle ==

#[test]
fn test_start_twice_reports_already_running() {
    let watcher = started();

    assert!(matches!(watcher.start(), Err(LogscopeError::AlreadyRunning)));
}

#[test]
fn test_stop_twice_clears_subscriptions() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = started();

    watcher.watch_file(&file, |_| {}).unwrap();
    watcher.stop();
    watcher.stop();

    assert!(!watcher.is_running());
    assert!(watcher.watched_paths().is_empty());
    assert_eq!(watcher.subscriber_count(&file), 0);
}

#[test]
fn test_stop_from_inside_callback() {
    let dir = TempDir::new().unwrap();
    let file = log_file(&dir, "app.log");
    let watcher = Arc::new(started());
    let (tx, rx) = mpsc::channel();

    let handle = Arc::downgrade(&watcher);
    watcher
        .watch_file(&file, move |_| {
            if let Some(watcher) = handle.upgrade() {
                watcher.stop();
            }
            let _ = tx.send(());
        })
        .unwrap();
    append(&file, "shutdown");

    rx.recv_timeout(WAIT).unwrap();
    assert!(!watcher.is_running());
}
