//! Owns the current [`FileSystemTreeSnapshot`] and serializes rebuilds on a
//! single worker.

use super::builder::DirectorySnapshotBuilder;
use super::changes::{FullPathChanges, PathChangeEntry};
use super::classifier::{ChangeClassification, classify_changes};
use super::types::{FileSystemTreeSnapshot, ProjectRootSnapshot};
use crate::cancel::{CancellationToken, VersionTracker};
use crate::error::{Error, Result};
use crate::paths::FileName;
use crate::project::{Project, ProjectDiscovery};
use crate::utils::task_queue::TaskQueue;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Notifications emitted by the snapshot manager, in order, from its worker.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    ScanStarted,
    /// A new tree was published. `changes` is set when the new tree was
    /// derived from `previous` by applying exactly those changes; `None`
    /// means the tree was rescanned and nothing about it can be trusted.
    SnapshotComputed {
        previous: Arc<FileSystemTreeSnapshot>,
        snapshot: Arc<FileSystemTreeSnapshot>,
        changes: Option<Arc<FullPathChanges>>,
        elapsed: Duration,
    },
    /// Only the contents of these files changed. The tree is unchanged.
    FilesChanged {
        snapshot: Arc<FileSystemTreeSnapshot>,
        files: Vec<FileName>,
    },
    /// The tree could not be computed.
    ScanFailed(String),
}

pub trait SnapshotListener: Send + Sync {
    fn on_snapshot_event(&self, event: SnapshotEvent);
}

#[derive(Debug, Default)]
struct PendingWork {
    rescan_all: bool,
    roots_changed: bool,
    changes: Vec<PathChangeEntry>,
}

impl PendingWork {
    fn is_empty(&self) -> bool {
        !self.rescan_all && !self.roots_changed && self.changes.is_empty()
    }

    fn merge(&mut self, other: PendingWork) {
        self.rescan_all |= other.rescan_all;
        self.roots_changed |= other.roots_changed;
        self.changes.extend(other.changes);
    }
}

struct Inner {
    discovery: Arc<dyn ProjectDiscovery>,
    current: RwLock<Arc<FileSystemTreeSnapshot>>,
    roots: Mutex<Vec<PathBuf>>,
    pending: Mutex<PendingWork>,
    paused: AtomicBool,
    versions: VersionTracker,
    listener: RwLock<Option<Arc<dyn SnapshotListener>>>,
}

pub struct FileSystemSnapshotManager {
    inner: Arc<Inner>,
    queue: TaskQueue,
}

impl FileSystemSnapshotManager {
    pub fn new(discovery: Arc<dyn ProjectDiscovery>) -> Self {
        Self {
            inner: Arc::new(Inner {
                discovery,
                current: RwLock::new(Arc::new(FileSystemTreeSnapshot::empty())),
                roots: Mutex::new(Vec::new()),
                pending: Mutex::new(PendingWork::default()),
                paused: AtomicBool::new(false),
                versions: VersionTracker::new(),
                listener: RwLock::new(None),
            }),
            queue: TaskQueue::new("codesnap-snapshot"),
        }
    }

    pub fn set_listener(&self, listener: Arc<dyn SnapshotListener>) {
        *self.inner.listener.write() = Some(listener);
    }

    pub fn current_snapshot(&self) -> Arc<FileSystemTreeSnapshot> {
        Arc::clone(&self.inner.current.read())
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.inner.roots.lock().clone()
    }

    /// Add `root` to the set of indexed paths. Returns false if it was
    /// already registered.
    pub fn register_root(&self, root: impl Into<PathBuf>) -> bool {
        let root = root.into();
        {
            let mut roots = self.inner.roots.lock();
            if roots.iter().any(|r| r == &root) {
                return false;
            }
            roots.push(root);
        }
        self.schedule(
            PendingWork {
                roots_changed: true,
                ..Default::default()
            },
            true,
        );
        true
    }

    pub fn unregister_root(&self, root: &Path) -> bool {
        {
            let mut roots = self.inner.roots.lock();
            let before = roots.len();
            roots.retain(|r| r != root);
            if roots.len() == before {
                return false;
            }
        }
        self.schedule(
            PendingWork {
                roots_changed: true,
                ..Default::default()
            },
            true,
        );
        true
    }

    /// Rescan every project from disk.
    pub fn refresh(&self) {
        self.schedule(
            PendingWork {
                rescan_all: true,
                ..Default::default()
            },
            true,
        );
    }

    pub fn apply_path_changes(&self, changes: Vec<PathChangeEntry>) {
        if changes.is_empty() {
            return;
        }
        self.schedule(
            PendingWork {
                changes,
                ..Default::default()
            },
            false,
        );
    }

    /// Stop processing work. Requests keep accumulating until [`resume`].
    ///
    /// [`resume`]: Self::resume
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        self.queue.post(move || inner.process());
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Wait for every queued rebuild to finish.
    pub fn flush(&self) {
        self.queue.flush();
    }

    fn schedule(&self, work: PendingWork, supersede: bool) {
        self.inner.pending.lock().merge(work);
        if supersede {
            // Running builds stop at their next directory boundary and
            // their work is picked up again by the task posted below.
            self.inner.versions.cancel_all();
        }
        let inner = Arc::clone(&self.inner);
        self.queue.post(move || inner.process());
    }
}

impl Drop for FileSystemSnapshotManager {
    fn drop(&mut self) {
        self.inner.versions.cancel_all();
        self.queue.shutdown();
    }
}

impl Inner {
    fn emit(&self, event: SnapshotEvent) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.on_snapshot_event(event);
        }
    }

    fn process(&self) {
        if self.paused.load(Ordering::SeqCst) {
            return;
        }
        let work = std::mem::take(&mut *self.pending.lock());
        if work.is_empty() {
            return;
        }
        let token = self.versions.current_token();

        match self.compute(&work, &token) {
            Ok(()) => {}
            Err(Error::Cancelled) => {
                debug!("snapshot computation cancelled, requeueing work");
                self.pending.lock().merge(work);
            }
            Err(e) => {
                warn!(error = %e, "snapshot computation failed");
                self.emit(SnapshotEvent::ScanFailed(e.to_string()));
            }
        }
    }

    /// Projects for the registered roots, deduplicated by root directory.
    fn projects(&self) -> Vec<Arc<Project>> {
        let roots = self.roots.lock().clone();
        let mut projects: Vec<Arc<Project>> = Vec::new();
        for root in roots {
            let project = match self.discovery.get_project(&root) {
                Some(project) => project,
                None => match Project::with_defaults(&root) {
                    Ok(project) => Arc::new(project),
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "cannot create project");
                        continue;
                    }
                },
            };
            if !projects
                .iter()
                .any(|p| p.root_path() == project.root_path())
            {
                projects.push(project);
            }
        }
        projects
    }

    fn compute(&self, work: &PendingWork, token: &CancellationToken) -> Result<()> {
        let previous = Arc::clone(&self.current.read());
        let mut rescan_all = work.rescan_all;
        let mut changes = None;

        if !rescan_all && !work.changes.is_empty() {
            match classify_changes(&previous, self.discovery.as_ref(), &work.changes) {
                ChangeClassification::NoChanges => {}
                ChangeClassification::FileModificationsOnly(paths) if !work.roots_changed => {
                    let files: Vec<FileName> = paths
                        .iter()
                        .filter_map(|p| previous.find_file(p).cloned())
                        .collect();
                    debug!(files = files.len(), "file contents changed");
                    self.emit(SnapshotEvent::FilesChanged {
                        snapshot: previous,
                        files,
                    });
                    return Ok(());
                }
                ChangeClassification::FileModificationsOnly(paths) => {
                    // The tree is being rebuilt for new roots anyway; the
                    // change set tells the database which files to reload.
                    changes = Some(FullPathChanges::new(paths.into_iter().map(|p| {
                        PathChangeEntry::new(p, super::changes::PathChangeKind::Changed)
                    })));
                }
                ChangeClassification::VariousFileChanges(c) => changes = Some(c),
                ChangeClassification::UnknownChanges => {
                    self.discovery.invalidate();
                    rescan_all = true;
                }
            }
            if changes.is_none() && !rescan_all && !work.roots_changed {
                return Ok(());
            }
        }

        self.emit(SnapshotEvent::ScanStarted);
        let started = Instant::now();
        let mut projects = Vec::new();
        let mut trusted = !rescan_all;

        for project in self.projects() {
            token.check()?;
            let builder = DirectorySnapshotBuilder::new(&project, token);
            let existing = previous
                .find_project(project.root_path())
                .filter(|old| old.project.version_hash() == project.version_hash());

            let directory = match (existing, rescan_all) {
                (Some(old), false) => match &changes {
                    Some(c) if c.touches(project.root_path()) => {
                        builder.incremental(&old.directory, c)?
                    }
                    _ => Arc::clone(&old.directory),
                },
                (existing, _) => {
                    if existing.is_some() || previous.find_project(project.root_path()).is_some() {
                        trusted = false;
                    }
                    builder.full_scan()?
                }
            };
            projects.push(ProjectRootSnapshot { project, directory });
        }
        token.check()?;

        let snapshot = {
            let mut current = self.current.write();
            let mut snapshot = FileSystemTreeSnapshot {
                version: current.version + 1,
                projects,
            };
            snapshot.sort_projects();
            let snapshot = Arc::new(snapshot);
            *current = Arc::clone(&snapshot);
            snapshot
        };

        let elapsed = started.elapsed();
        info!(
            version = snapshot.version,
            projects = snapshot.projects.len(),
            files = snapshot.file_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "file system snapshot computed"
        );
        self.emit(SnapshotEvent::SnapshotComputed {
            previous,
            snapshot,
            changes: if trusted {
                Some(Arc::new(changes.unwrap_or_default()))
            } else {
                None
            },
            elapsed,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FileProjectDiscovery;
    use crate::snapshot::changes::PathChangeKind;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<SnapshotEvent>>);

    impl SnapshotListener for Recorder {
        fn on_snapshot_event(&self, event: SnapshotEvent) {
            self.0.lock().push(event);
        }
    }

    fn setup() -> (TempDir, FileSystemSnapshotManager, Arc<Recorder>) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let manager = FileSystemSnapshotManager::new(Arc::new(FileProjectDiscovery::new()));
        let recorder = Arc::new(Recorder::default());
        manager.set_listener(recorder.clone());
        (dir, manager, recorder)
    }

    #[test]
    fn register_publishes_snapshot() {
        let (dir, manager, recorder) = setup();
        assert!(manager.register_root(dir.path()));
        assert!(!manager.register_root(dir.path()));
        manager.flush();

        let snapshot = manager.current_snapshot();
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.file_count(), 1);
        assert!(recorder
            .0
            .lock()
            .iter()
            .any(|e| matches!(e, SnapshotEvent::SnapshotComputed { .. })));
    }

    #[test]
    fn modification_emits_files_changed() {
        let (dir, manager, recorder) = setup();
        manager.register_root(dir.path());
        manager.flush();
        let version = manager.current_snapshot().version;

        fs::write(dir.path().join("a.txt"), "beta").unwrap();
        manager.apply_path_changes(vec![PathChangeEntry::new(
            dir.path().join("a.txt"),
            PathChangeKind::Changed,
        )]);
        manager.flush();

        assert_eq!(manager.current_snapshot().version, version);
        assert!(recorder
            .0
            .lock()
            .iter()
            .any(|e| matches!(e, SnapshotEvent::FilesChanged { files, .. } if files.len() == 1)));
    }

    #[test]
    fn creation_is_applied_incrementally() {
        let (dir, manager, recorder) = setup();
        manager.register_root(dir.path());
        manager.flush();

        fs::write(dir.path().join("b.txt"), "b").unwrap();
        manager.apply_path_changes(vec![PathChangeEntry::new(
            dir.path().join("b.txt"),
            PathChangeKind::Created,
        )]);
        manager.flush();

        assert_eq!(manager.current_snapshot().file_count(), 2);
        let events = recorder.0.lock();
        let last = events.last().unwrap();
        assert!(matches!(
            last,
            SnapshotEvent::SnapshotComputed { changes: Some(_), .. }
        ));
    }

    #[test]
    fn paused_manager_defers_work() {
        let (dir, manager, _recorder) = setup();
        manager.pause();
        manager.register_root(dir.path());
        manager.flush();
        assert!(manager.current_snapshot().projects.is_empty());

        manager.resume();
        manager.flush();
        assert_eq!(manager.current_snapshot().projects.len(), 1);
    }

    #[test]
    fn unregister_removes_project() {
        let (dir, manager, _recorder) = setup();
        manager.register_root(dir.path());
        manager.flush();
        assert!(manager.unregister_root(dir.path()));
        manager.flush();
        assert!(manager.current_snapshot().projects.is_empty());
    }
}
