//! Watches project roots with `notify` and forwards debounced change
//! batches.

use super::debouncer::EventDebouncer;
use crate::error::Result;
use crate::snapshot::{PathChangeEntry, PathChangeKind};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Longest time the watcher thread sleeps before checking for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Map a notify event to path changes.
fn event_changes(event: &Event) -> Vec<(PathBuf, PathChangeKind)> {
    let kind = match event.kind {
        EventKind::Create(_) => PathChangeKind::Created,
        EventKind::Remove(_) => PathChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            return vec![
                (event.paths[0].clone(), PathChangeKind::Deleted),
                (event.paths[1].clone(), PathChangeKind::Created),
            ];
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => PathChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => PathChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => {
            return event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        PathChangeKind::Created
                    } else {
                        PathChangeKind::Deleted
                    };
                    (p.clone(), kind)
                })
                .collect();
        }
        EventKind::Modify(_) => PathChangeKind::Changed,
        _ => return Vec::new(),
    };
    event.paths.iter().map(|p| (p.clone(), kind)).collect()
}

/// Handle to a running watcher thread. Dropping it stops the thread.
pub struct DirectoryWatcher {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    roots: Vec<PathBuf>,
}

impl DirectoryWatcher {
    /// Watch `roots` recursively. Batches are handed to `sink` once no event
    /// arrived for `debounce`.
    pub fn start(
        roots: &[PathBuf],
        debounce: Duration,
        sink: impl Fn(Vec<PathChangeEntry>) + Send + 'static,
    ) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => warn!(error = %e, "watch error"),
            },
            notify::Config::default(),
        )?;
        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            info!(root = %root.display(), "watching for changes");
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("codesnap-watcher".to_string())
            .spawn(move || {
                // Keeps the OS watch alive for the life of the thread.
                let _watcher = watcher;
                let mut debouncer = EventDebouncer::new(debounce);
                while !stop.load(Ordering::Relaxed) {
                    let timeout = debouncer
                        .time_until_ready()
                        .map_or(POLL_INTERVAL, |t| t.clamp(Duration::from_millis(1), POLL_INTERVAL));
                    match event_rx.recv_timeout(timeout) {
                        Ok(event) => {
                            for (path, kind) in event_changes(&event) {
                                trace!(path = %path.display(), ?kind, "file system event");
                                debouncer.add_event(path, kind);
                            }
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                    if debouncer.has_pending() && debouncer.is_ready() {
                        if let Some(batch) = debouncer.flush() {
                            debug!(changes = batch.len(), "forwarding change batch");
                            sink(batch);
                        }
                    }
                }
            })?;

        Ok(Self {
            shutdown,
            thread: Some(thread),
            roots: roots.to_vec(),
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.roots.iter().any(|r| path.starts_with(r))
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn maps_event_kinds() {
        let created = event_changes(&event(EventKind::Create(CreateKind::File), &["/p/a"]));
        assert_eq!(created, vec![(PathBuf::from("/p/a"), PathChangeKind::Created)]);

        let removed = event_changes(&event(EventKind::Remove(RemoveKind::Any), &["/p/a"]));
        assert_eq!(removed, vec![(PathBuf::from("/p/a"), PathChangeKind::Deleted)]);

        let modified = event_changes(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/p/a"],
        ));
        assert_eq!(modified, vec![(PathBuf::from("/p/a"), PathChangeKind::Changed)]);

        let access = event_changes(&event(EventKind::Access(notify::event::AccessKind::Any), &["/p/a"]));
        assert!(access.is_empty());
    }

    #[test]
    fn rename_becomes_delete_and_create() {
        let renamed = event_changes(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old", "/p/new"],
        ));
        assert_eq!(
            renamed,
            vec![
                (PathBuf::from("/p/old"), PathChangeKind::Deleted),
                (PathBuf::from("/p/new"), PathChangeKind::Created),
            ]
        );
    }
}
