//! Builds [`DirectorySnapshot`] trees, either from scratch or by applying a
//! change set to an older tree.

use super::changes::FullPathChanges;
use super::types::DirectorySnapshot;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::paths::{DirectoryName, NAME_COMPARER};
use crate::project::Project;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};

/// Counters collected during one build.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub directories: AtomicUsize,
    pub files: AtomicUsize,
    pub skipped: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory { is_symlink: bool },
    File,
}

/// Classify `path`, following symbolic links. `None` if it cannot be read.
fn entry_kind(path: &Path) -> Option<EntryKind> {
    let meta = fs::symlink_metadata(path).ok()?;
    if meta.file_type().is_symlink() {
        let target = fs::metadata(path).ok()?;
        return Some(if target.is_dir() {
            EntryKind::Directory { is_symlink: true }
        } else {
            EntryKind::File
        });
    }
    if meta.is_dir() {
        Some(EntryKind::Directory { is_symlink: false })
    } else {
        Some(EntryKind::File)
    }
}

pub struct DirectorySnapshotBuilder<'a> {
    project: &'a Project,
    token: &'a CancellationToken,
    stats: ScanStats,
}

impl<'a> DirectorySnapshotBuilder<'a> {
    pub fn new(project: &'a Project, token: &'a CancellationToken) -> Self {
        Self {
            project,
            token,
            stats: ScanStats::default(),
        }
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Walk the whole project.
    pub fn full_scan(&self) -> Result<Arc<DirectorySnapshot>> {
        let root = self.project.root().clone();
        let snapshot = self.scan_directory(
            root,
            self.project.root_path().to_path_buf(),
            PathBuf::new(),
            false,
        )?;
        debug!(
            root = %self.project.root_path().display(),
            directories = self.stats.directories.load(Ordering::Relaxed),
            files = self.stats.files.load(Ordering::Relaxed),
            skipped = self.stats.skipped.load(Ordering::Relaxed),
            "full scan finished"
        );
        Ok(Arc::new(snapshot))
    }

    /// Apply `changes` to `old`. Subtrees without changes are shared with
    /// `old`.
    pub fn incremental(
        &self,
        old: &Arc<DirectorySnapshot>,
        changes: &FullPathChanges,
    ) -> Result<Arc<DirectorySnapshot>> {
        self.apply(old, self.project.root_path(), Path::new(""), changes)
    }

    fn scan_directory(
        &self,
        name: DirectoryName,
        full_path: PathBuf,
        relative: PathBuf,
        is_symlink: bool,
    ) -> Result<DirectorySnapshot> {
        self.token.check()?;
        self.stats.directories.fetch_add(1, Ordering::Relaxed);

        let mut snapshot = DirectorySnapshot::empty(name, is_symlink);
        let entries = match fs::read_dir(&full_path) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(path = %full_path.display(), error = %e, "cannot read directory");
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(snapshot);
            }
        };

        let mut child_dirs = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!(path = %entry.path().display(), "skipping entry with a non UTF-8 name");
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            let child_relative = relative.join(name);
            let child_path = entry.path();

            let kind = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => entry_kind(&child_path),
                Ok(ft) if ft.is_dir() => Some(EntryKind::Directory { is_symlink: false }),
                Ok(_) => Some(EntryKind::File),
                Err(_) => None,
            };
            match kind {
                Some(EntryKind::Directory { is_symlink }) => {
                    if !self.project.is_directory_included(&child_relative) {
                        continue;
                    }
                    if is_symlink && Self::links_to_ancestor(&full_path, &child_path) {
                        continue;
                    }
                    child_dirs.push((name.to_string(), child_path, child_relative, is_symlink));
                }
                Some(EntryKind::File) => {
                    if self.project.is_file_included(&child_relative) {
                        self.stats.files.fetch_add(1, Ordering::Relaxed);
                        snapshot.files.push(snapshot.name.child_file(name));
                    }
                }
                None => {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let parent = snapshot.name.clone();
        snapshot.directories = child_dirs
            .into_par_iter()
            .map(|(name, path, relative, is_symlink)| {
                self.scan_directory(parent.child_directory(&name), path, relative, is_symlink)
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        snapshot.sort_children();
        Ok(snapshot)
    }

    /// A symbolic link pointing at one of its own ancestors would recurse
    /// forever.
    fn links_to_ancestor(parent: &Path, link: &Path) -> bool {
        match (fs::canonicalize(parent), fs::canonicalize(link)) {
            (Ok(parent), Ok(target)) => parent.starts_with(target),
            _ => true,
        }
    }

    fn apply(
        &self,
        old: &Arc<DirectorySnapshot>,
        full_path: &Path,
        relative: &Path,
        changes: &FullPathChanges,
    ) -> Result<Arc<DirectorySnapshot>> {
        self.token.check()?;
        if !changes.is_affected(full_path) {
            return Ok(Arc::clone(old));
        }

        let deleted = changes.deleted_children(full_path);
        let created = changes.created_children(full_path);
        let changed = changes.changed_children(full_path);
        let listed = |names: &[String], name: &str| names.iter().any(|n| NAME_COMPARER.equals(n, name));
        // Created or changed names may have switched between file and
        // directory; those are restated before reusing the old entry.
        let touched = |name: &str| listed(created, name) || listed(changed, name);

        let directories: Vec<Option<Arc<DirectorySnapshot>>> = old
            .directories
            .par_iter()
            .filter(|d| !listed(deleted, d.name.name()))
            .map(|d| {
                let child_path = full_path.join(d.name.name());
                let child_relative = relative.join(d.name.name());
                if !touched(d.name.name()) {
                    return self.apply(d, &child_path, &child_relative, changes).map(Some);
                }
                match entry_kind(&child_path) {
                    Some(EntryKind::Directory { is_symlink }) if listed(changed, d.name.name()) => {
                        // Replaced wholesale (deleted and recreated).
                        self.scan_directory(d.name.clone(), child_path, child_relative, is_symlink)
                            .map(|s| Some(Arc::new(s)))
                    }
                    Some(EntryKind::Directory { .. }) => {
                        self.apply(d, &child_path, &child_relative, changes).map(Some)
                    }
                    _ => Ok(None),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let mut directories: Vec<Arc<DirectorySnapshot>> = directories.into_iter().flatten().collect();

        let mut files: Vec<_> = old
            .files
            .iter()
            .filter(|f| !listed(deleted, f.name()))
            .filter(|f| {
                !touched(f.name())
                    || matches!(entry_kind(&full_path.join(f.name())), Some(EntryKind::File))
            })
            .cloned()
            .collect();

        // Removals keep the order; only insertions need a re-sort.
        let mut dirty = false;
        for name in created.iter().chain(changed) {
            let known = directories.iter().any(|d| NAME_COMPARER.equals(d.name.name(), name))
                || files.iter().any(|f| NAME_COMPARER.equals(f.name(), name));
            if known {
                continue;
            }
            let child_path = full_path.join(name);
            let child_relative = relative.join(name);
            match entry_kind(&child_path) {
                Some(EntryKind::Directory { is_symlink }) => {
                    if !self.project.is_directory_included(&child_relative)
                        || (is_symlink && Self::links_to_ancestor(full_path, &child_path))
                    {
                        continue;
                    }
                    let subtree = self.scan_directory(
                        old.name.child_directory(name),
                        child_path,
                        child_relative,
                        is_symlink,
                    )?;
                    directories.push(Arc::new(subtree));
                    dirty = true;
                }
                Some(EntryKind::File) => {
                    if self.project.is_file_included(&child_relative) {
                        files.push(old.name.child_file(name));
                        dirty = true;
                    }
                }
                None => {
                    trace!(path = %child_path.display(), "created path vanished");
                }
            }
        }

        let mut snapshot = DirectorySnapshot {
            name: old.name.clone(),
            is_symlink: old.is_symlink,
            directories,
            files,
        };
        if dirty {
            snapshot.sort_children();
        }
        Ok(Arc::new(snapshot))
    }
}
