//! OS filesystem notifications for the watch roots.

use crate::debounce::Debouncer;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use notify::event::{CreateKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use tracing::{info, warn};

/// Feeds every file change under the watched roots into a [`Debouncer`].
///
/// Notifications stop when this is dropped.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher").field("watched", &self.watched).finish()
    }
}

impl ChangeWatcher {
    /// Start watching every root that currently exists; missing roots are
    /// skipped rather than treated as errors.
    pub fn new(roots: &[PathBuf], debouncer: Debouncer) -> Result<Self> {
        let mut watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| match event {
                Ok(event) => {
                    for path in changed_files(&event) {
                        debouncer.on_file_event(path);
                    }
                },
                Err(err) => warn!(error = %err, "filesystem watcher error"),
            },
            Config::default(),
        )
        .or_raise(|| ErrorKind::Watch)?;
        let mut watched = Vec::with_capacity(roots.len());
        for root in roots {
            if !root.is_dir() {
                info!(root = %root.display(), "watch root does not exist, skipping");
                continue;
            }
            watcher.watch(root, RecursiveMode::Recursive).or_raise(|| ErrorKind::Watch)?;
            info!(root = %root.display(), "watching for changes");
            watched.push(root.clone());
        }
        Ok(Self { _watcher: watcher, watched })
    }

    /// Roots that are actually being watched.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Paths of an event that may concern a file: creations, modifications,
/// removals and renames. Reads and directory events are dropped.
fn changed_files(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Access(_) | EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            Vec::new()
        },
        // A removed or renamed-away path can no longer be checked; keep it in
        // case it was a file.
        _ => event.paths.iter().filter(|path| !path.is_dir()).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{self, Command};
    use notify::event::{AccessKind, ModifyKind, RenameMode};
    use rstest::rstest;
    use std::time::Duration;
    use tokio::runtime::Handle;

    #[rstest]
    #[case::create(EventKind::Create(CreateKind::File), 1)]
    #[case::modify(EventKind::Modify(ModifyKind::Any), 1)]
    #[case::rename(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), 1)]
    #[case::remove(EventKind::Remove(RemoveKind::File), 1)]
    #[case::access(EventKind::Access(AccessKind::Any), 0)]
    #[case::create_folder(EventKind::Create(CreateKind::Folder), 0)]
    #[case::remove_folder(EventKind::Remove(RemoveKind::Folder), 0)]
    fn test_changed_files(#[case] kind: EventKind, #[case] expected: usize) {
        let event = Event::new(kind).add_path(PathBuf::from("/nonexistent/comics/Saga 001.cbz"));
        assert_eq!(changed_files(&event).len(), expected);
    }

    #[test]
    fn test_existing_directories_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(dir.path().to_path_buf())
            .add_path(dir.path().join("gone.cbz"));
        assert_eq!(changed_files(&event), vec![dir.path().join("gone.cbz")]);
    }

    #[tokio::test]
    async fn test_missing_roots_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-here");
        let (tx, _rx) = command::channel();
        let debouncer = Debouncer::new(Duration::from_secs(30), tx, Handle::current());
        let watcher = ChangeWatcher::new(&[dir.path().to_path_buf(), missing], debouncer).unwrap();
        assert_eq!(watcher.watched(), [dir.path().to_path_buf()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_new_file_triggers_rescan() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = command::channel();
        let debouncer = Debouncer::new(Duration::from_millis(100), tx, Handle::current());
        let _watcher = ChangeWatcher::new(&[dir.path().to_path_buf()], debouncer).unwrap();
        std::fs::write(dir.path().join("new.cbz"), b"not yet a comic").unwrap();
        let first = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(first, Command::Events(paths) if paths.iter().any(|p| p.ends_with("new.cbz"))));
        let second = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second, Command::Scan);
    }
}
