//! Builds [`FileDatabaseSnapshot`]s from file system snapshots.

use super::partition::partition_pieces;
use super::snapshot::{FileDatabaseSnapshot, FileWithContents};
use crate::cancel::CancellationToken;
use crate::contents::{
    FileContents, FileContentsPiece, LoadOptions, last_modified, load_file_contents,
    split_into_pieces,
};
use crate::error::{Error, Result};
use crate::paths::FileName;
use crate::project::Project;
use crate::snapshot::{FileSystemTreeSnapshot, FullPathChanges, PathChangeKind};
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Files loaded between two cancellation and progress checks.
const LOAD_BATCH_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub load: LoadOptions,
    /// Maximum piece size in bytes.
    pub chunk_size: usize,
    pub partition_count: usize,
    /// Minimum time between two partial snapshots.
    pub partial_interval: Duration,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            chunk_size: 100 * 1024,
            partition_count: std::thread::available_parallelism().map_or(4, |n| n.get()),
            partial_interval: Duration::from_secs(1),
        }
    }
}

/// Shares identical contents between files within one build.
#[derive(Default)]
struct ContentsMemo {
    entries: Mutex<FxHashMap<u64, Vec<Arc<FileContents>>>>,
}

impl ContentsMemo {
    fn intern(&self, contents: FileContents) -> Arc<FileContents> {
        if !contents.is_searchable() {
            return Arc::new(contents);
        }
        let hash = contents.content_hash();
        let mut entries = self.entries.lock();
        let bucket = entries.entry(hash).or_default();
        if let Some(existing) = bucket.iter().find(|c| c.contents_equal(&contents)) {
            return Arc::clone(existing);
        }
        let contents = Arc::new(contents);
        bucket.push(Arc::clone(&contents));
        contents
    }
}

struct FileEntry<'a> {
    name: FileName,
    under_symlink: bool,
    project: &'a Project,
}

pub struct FileDatabaseBuilder {
    options: BuildOptions,
}

impl FileDatabaseBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the database for `tree`, reusing contents from `previous`.
    ///
    /// `changes` are the path changes between the tree `previous` was built
    /// from and `tree`. Without them, every reused file is checked with a
    /// stat. `on_partial` receives incomplete snapshots while contents load.
    pub fn build(
        &self,
        previous: &FileDatabaseSnapshot,
        tree: &FileSystemTreeSnapshot,
        changes: Option<&FullPathChanges>,
        token: &CancellationToken,
        on_partial: &(dyn Fn(Arc<FileDatabaseSnapshot>) + Sync),
    ) -> Result<FileDatabaseSnapshot> {
        let started = Instant::now();
        let mut roots = Vec::with_capacity(tree.projects.len());
        let mut project_hashes = FxHashMap::default();
        let mut directories = Vec::new();
        let mut entries = Vec::new();

        for root in &tree.projects {
            let project = root.project.as_ref();
            roots.push(project.root().clone());
            project_hashes.insert(project.root().clone(), project.version_hash());
            root.directory.visit(&mut |dir, under_symlink| {
                directories.push(dir.name.clone());
                entries.extend(dir.files.iter().map(|f| FileEntry {
                    name: f.clone(),
                    under_symlink,
                    project,
                }));
            });
        }
        token.check()?;
        directories.sort();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let reused = AtomicUsize::new(0);
        let (files, needs_load): (Vec<FileWithContents>, Vec<bool>) = entries
            .par_iter()
            .map(|entry| {
                let (contents, needs_load) = match self.reusable_contents(previous, entry, changes) {
                    Some(contents) => {
                        reused.fetch_add(1, Ordering::Relaxed);
                        (contents, false)
                    }
                    None => (None, entry.project.is_searchable(&entry.name.relative_path())),
                };
                let file = FileWithContents {
                    file_name: entry.name.clone(),
                    contents,
                    under_symlink: entry.under_symlink,
                };
                (file, needs_load)
            })
            .unzip();
        let to_load: Vec<usize> = needs_load
            .iter()
            .enumerate()
            .filter_map(|(slot, &load)| load.then_some(slot))
            .collect();
        token.check()?;

        let file_index: FxHashMap<FileName, usize> = files
            .iter()
            .enumerate()
            .map(|(slot, f)| (f.file_name.clone(), slot))
            .collect();
        let mut snapshot = FileDatabaseSnapshot {
            version: tree.version,
            complete: false,
            roots,
            project_hashes,
            directories: Arc::new(directories),
            file_index: Arc::new(file_index),
            files,
            partitions: Vec::new(),
        };

        let memo = ContentsMemo::default();
        let mut last_partial = Instant::now();
        for batch in to_load.chunks(LOAD_BATCH_SIZE) {
            token.check()?;
            let loaded: Vec<(usize, Arc<FileContents>)> = batch
                .par_iter()
                .map(|&slot| {
                    let path = snapshot.files[slot].file_name.full_path();
                    (slot, memo.intern(load_file_contents(&path, &self.options.load)))
                })
                .collect();
            for (slot, contents) in loaded {
                snapshot.files[slot].contents = Some(contents);
            }
            if last_partial.elapsed() >= self.options.partial_interval {
                let mut partial = snapshot.clone();
                partial.partitions = self.partitions_for(&partial.files);
                on_partial(Arc::new(partial));
                last_partial = Instant::now();
            }
        }
        token.check()?;

        snapshot.partitions = self.partitions_for(&snapshot.files);
        snapshot.complete = true;
        info!(
            version = snapshot.version,
            files = snapshot.files.len(),
            reused = reused.load(Ordering::Relaxed),
            loaded = to_load.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "file database built"
        );
        Ok(snapshot)
    }

    /// Contents of `entry` carried over from `previous`, if the file is
    /// known to be unchanged. The outer `Option` tells whether anything
    /// was reused; the inner one is the reused contents.
    fn reusable_contents(
        &self,
        previous: &FileDatabaseSnapshot,
        entry: &FileEntry<'_>,
        changes: Option<&FullPathChanges>,
    ) -> Option<Option<Arc<FileContents>>> {
        let root = entry.project.root();
        if previous.project_hash(root) != Some(entry.project.version_hash()) {
            return None;
        }
        let old = previous.file(&entry.name)?;
        let path = entry.name.full_path();
        let unchanged = match (changes, &old.contents) {
            (Some(changes), _) if !entry.under_symlink => {
                changes.kind(&path) == PathChangeKind::None
            }
            (_, Some(contents)) => last_modified(&path) == Some(contents.last_modified()),
            // Nothing to compare a stat against.
            (_, None) => false,
        };
        unchanged.then(|| old.contents.clone())
    }

    /// Targeted update: reload `changed` files and share everything else,
    /// including the name index, with `previous`.
    ///
    /// Every changed file must already be in `previous`; otherwise
    /// [`Error::PreconditionFailed`] is returned and a full build is needed.
    pub fn build_with_changed_files(
        &self,
        previous: &FileDatabaseSnapshot,
        changed: &[FileName],
    ) -> Result<FileDatabaseSnapshot> {
        let slots = changed
            .iter()
            .map(|name| {
                previous.slot(name).ok_or_else(|| {
                    Error::PreconditionFailed(format!("{} is not in the database", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut snapshot = previous.clone();
        let reloaded: Vec<(usize, Arc<FileContents>)> = slots
            .par_iter()
            .filter(|&&slot| previous.files[slot].contents.is_some())
            .map(|&slot| {
                let path = previous.files[slot].file_name.full_path();
                (slot, Arc::new(load_file_contents(&path, &self.options.load)))
            })
            .collect();
        debug!(files = reloaded.len(), "reloading changed files");
        for (slot, contents) in reloaded {
            snapshot.files[slot].contents = Some(contents);
        }
        snapshot.partitions = self.partitions_for(&snapshot.files);
        Ok(snapshot)
    }

    fn partitions_for(&self, files: &[FileWithContents]) -> Vec<Vec<FileContentsPiece>> {
        let pieces = files
            .iter()
            .enumerate()
            .filter_map(|(slot, f)| f.contents.as_ref().map(|c| (slot, &f.file_name, c)))
            .flat_map(|(slot, name, contents)| {
                split_into_pieces(slot, name, contents, self.options.chunk_size)
            })
            .collect();
        partition_pieces(pieces, self.options.partition_count)
    }
}
