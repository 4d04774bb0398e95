//! Keeps the current [`FileDatabaseSnapshot`] in step with the file system
//! snapshots it is fed.

use super::builder::FileDatabaseBuilder;
use super::snapshot::FileDatabaseSnapshot;
use crate::cancel::VersionTracker;
use crate::error::Error;
use crate::paths::FileName;
use crate::snapshot::{
    FileSystemTreeSnapshot, FullPathChanges, PathChangeEntry, PathChangeKind, SnapshotEvent,
    SnapshotListener,
};
use crate::utils::task_queue::TaskQueue;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum DatabaseEvent {
    /// Contents are still loading; searches see what is loaded so far.
    Partial(Arc<FileDatabaseSnapshot>),
    Computed {
        database: Arc<FileDatabaseSnapshot>,
        elapsed: Duration,
    },
    /// A targeted update replaced the contents of a few files.
    FilesUpdated {
        database: Arc<FileDatabaseSnapshot>,
        files: usize,
    },
}

pub trait DatabaseListener: Send + Sync {
    fn on_database_event(&self, event: DatabaseEvent);
}

#[derive(Debug, Default)]
struct PendingRebuild {
    tree: Option<Arc<FileSystemTreeSnapshot>>,
    /// Oldest first.
    changes: Vec<PathChangeEntry>,
    /// Some tree in this batch was rescanned: change sets cannot be trusted.
    untrusted: bool,
    modified: Vec<FileName>,
    modified_tree: Option<Arc<FileSystemTreeSnapshot>>,
}

impl PendingRebuild {
    fn is_empty(&self) -> bool {
        self.tree.is_none() && self.modified.is_empty()
    }

    /// Put back work taken before `self` was queued.
    fn absorb_older(&mut self, older: PendingRebuild) {
        if self.tree.is_none() {
            self.tree = older.tree;
        }
        let newer = std::mem::replace(&mut self.changes, older.changes);
        self.changes.extend(newer);
        self.untrusted |= older.untrusted;
        self.modified.extend(older.modified);
        if self.modified_tree.is_none() {
            self.modified_tree = older.modified_tree;
        }
    }
}

struct Inner {
    builder: FileDatabaseBuilder,
    current: RwLock<Arc<FileDatabaseSnapshot>>,
    /// Last snapshot with every content loaded; the base for reuse.
    last_complete: RwLock<Arc<FileDatabaseSnapshot>>,
    pending: Mutex<PendingRebuild>,
    versions: VersionTracker,
    listener: RwLock<Option<Arc<dyn DatabaseListener>>>,
}

pub struct FileDatabaseManager {
    inner: Arc<Inner>,
    queue: TaskQueue,
}

impl FileDatabaseManager {
    pub fn new(builder: FileDatabaseBuilder) -> Self {
        let empty = Arc::new(FileDatabaseSnapshot::empty());
        Self {
            inner: Arc::new(Inner {
                builder,
                current: RwLock::new(Arc::clone(&empty)),
                last_complete: RwLock::new(empty),
                pending: Mutex::new(PendingRebuild::default()),
                versions: VersionTracker::new(),
                listener: RwLock::new(None),
            }),
            queue: TaskQueue::new("codesnap-database"),
        }
    }

    pub fn set_listener(&self, listener: Arc<dyn DatabaseListener>) {
        *self.inner.listener.write() = Some(listener);
    }

    pub fn current_database(&self) -> Arc<FileDatabaseSnapshot> {
        Arc::clone(&self.inner.current.read())
    }

    /// Schedule a rebuild for `tree`. A rebuild in progress is cancelled;
    /// its work is merged into this one.
    pub fn on_tree_computed(
        &self,
        tree: Arc<FileSystemTreeSnapshot>,
        changes: Option<&FullPathChanges>,
    ) {
        {
            let mut pending = self.inner.pending.lock();
            pending.tree = Some(tree);
            match changes {
                Some(changes) => pending.changes.extend(changes.entries()),
                None => pending.untrusted = true,
            }
        }
        self.inner.versions.cancel_all();
        self.post();
    }

    /// Schedule a targeted reload of `files` from `tree`.
    pub fn on_files_changed(&self, tree: Arc<FileSystemTreeSnapshot>, files: Vec<FileName>) {
        if files.is_empty() {
            return;
        }
        {
            let mut pending = self.inner.pending.lock();
            pending.modified.extend(files);
            pending.modified_tree = Some(tree);
        }
        self.post();
    }

    pub fn flush(&self) {
        self.queue.flush();
    }

    fn post(&self) {
        let inner = Arc::clone(&self.inner);
        self.queue.post(move || inner.process());
    }
}

impl SnapshotListener for FileDatabaseManager {
    fn on_snapshot_event(&self, event: SnapshotEvent) {
        match event {
            SnapshotEvent::SnapshotComputed {
                snapshot, changes, ..
            } => self.on_tree_computed(snapshot, changes.as_deref()),
            SnapshotEvent::FilesChanged { snapshot, files } => {
                self.on_files_changed(snapshot, files)
            }
            SnapshotEvent::ScanStarted | SnapshotEvent::ScanFailed(_) => {}
        }
    }
}

impl Drop for FileDatabaseManager {
    fn drop(&mut self) {
        self.inner.versions.cancel_all();
        self.queue.shutdown();
    }
}

impl Inner {
    fn emit(&self, event: DatabaseEvent) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.on_database_event(event);
        }
    }

    fn publish(&self, database: Arc<FileDatabaseSnapshot>) {
        if database.is_complete() {
            *self.last_complete.write() = Arc::clone(&database);
        }
        *self.current.write() = database;
    }

    fn process(&self) {
        let work = std::mem::take(&mut *self.pending.lock());
        if work.is_empty() {
            return;
        }
        let token = self.versions.current_token();
        let previous = Arc::clone(&self.last_complete.read());
        let started = Instant::now();

        if work.tree.is_none() {
            self.process_modified(&previous, work);
            return;
        }

        let Some(tree) = work.tree.clone() else {
            return;
        };
        let changes = if work.untrusted {
            None
        } else {
            let modified = work
                .modified
                .iter()
                .map(|f| PathChangeEntry::new(f.full_path(), PathChangeKind::Changed));
            Some(FullPathChanges::new(work.changes.iter().cloned().chain(modified)))
        };
        let on_partial = |partial: Arc<FileDatabaseSnapshot>| {
            debug!(version = partial.version(), "publishing partial database");
            self.publish(Arc::clone(&partial));
            self.emit(DatabaseEvent::Partial(partial));
        };

        match self
            .builder
            .build(&previous, &tree, changes.as_ref(), &token, &on_partial)
        {
            Ok(database) => {
                let database = Arc::new(database);
                self.publish(Arc::clone(&database));
                self.emit(DatabaseEvent::Computed {
                    database,
                    elapsed: started.elapsed(),
                });
            }
            Err(Error::Cancelled) => {
                debug!("database build cancelled, requeueing work");
                self.pending.lock().absorb_older(work);
            }
            Err(e) => warn!(error = %e, "database build failed"),
        }
    }

    fn process_modified(&self, previous: &Arc<FileDatabaseSnapshot>, work: PendingRebuild) {
        let mut files = work.modified;
        files.sort();
        files.dedup();
        match self.builder.build_with_changed_files(previous, &files) {
            Ok(database) => {
                let database = Arc::new(database);
                info!(files = files.len(), "file contents updated");
                self.publish(Arc::clone(&database));
                self.emit(DatabaseEvent::FilesUpdated {
                    database,
                    files: files.len(),
                });
            }
            Err(Error::PreconditionFailed(reason)) => {
                debug!(%reason, "targeted update not possible, rebuilding");
                let Some(tree) = work.modified_tree else {
                    return;
                };
                let mut pending = self.pending.lock();
                pending.absorb_older(PendingRebuild {
                    tree: Some(tree),
                    untrusted: true,
                    ..Default::default()
                });
                drop(pending);
                self.process();
            }
            Err(e) => warn!(error = %e, "targeted update failed"),
        }
    }
}
