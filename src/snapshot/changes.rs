use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of change reported for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathChangeKind {
    None,
    Created,
    Deleted,
    Changed,
}

impl PathChangeKind {
    /// Combine two changes seen for the same path, oldest first.
    ///
    /// - Created + Changed = Created
    /// - Created + Deleted = None (the path never existed for us)
    /// - Changed + Deleted = Deleted
    /// - Deleted + Created = Changed
    pub fn merge(self, next: PathChangeKind) -> PathChangeKind {
        use PathChangeKind::*;
        match (self, next) {
            (None, k) | (k, None) => k,
            (Created, Changed) => Created,
            (Created, Deleted) => None,
            (Changed, Deleted) => Deleted,
            (Deleted, Created) => Changed,
            (Deleted, Changed) => Changed,
            (Changed, Created) => Changed,
            (Created, Created) => Created,
            (Changed, Changed) => Changed,
            (Deleted, Deleted) => Deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathChangeEntry {
    pub path: PathBuf,
    pub kind: PathChangeKind,
}

impl PathChangeEntry {
    pub fn new(path: impl Into<PathBuf>, kind: PathChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Net changes of a batch, indexed for the incremental tree builder.
///
/// Besides the per-path kind this keeps, for every parent directory, the
/// child names that were created, deleted or changed, and the set of all
/// directories that contain at least one change somewhere below them.
#[derive(Debug, Clone, Default)]
pub struct FullPathChanges {
    entries: FxHashMap<PathBuf, PathChangeKind>,
    created: FxHashMap<PathBuf, Vec<String>>,
    deleted: FxHashMap<PathBuf, Vec<String>>,
    changed: FxHashMap<PathBuf, Vec<String>>,
    affected: FxHashSet<PathBuf>,
}

impl FullPathChanges {
    pub fn new(entries: impl IntoIterator<Item = PathChangeEntry>) -> Self {
        let mut merged: FxHashMap<PathBuf, PathChangeKind> = FxHashMap::default();
        for entry in entries {
            let kind = merged
                .get(&entry.path)
                .copied()
                .unwrap_or(PathChangeKind::None)
                .merge(entry.kind);
            merged.insert(entry.path, kind);
        }
        merged.retain(|_, kind| *kind != PathChangeKind::None);

        let mut changes = Self::default();
        for (path, kind) in &merged {
            changes.index(path, *kind);
        }
        changes.entries = merged;
        changes
    }

    fn index(&mut self, path: &Path, kind: PathChangeKind) {
        // Names that are not UTF-8 never enter a snapshot.
        let (Some(parent), Some(name)) =
            (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return;
        };
        let name = name.to_string();
        let table = match kind {
            PathChangeKind::Created => &mut self.created,
            PathChangeKind::Deleted => &mut self.deleted,
            PathChangeKind::Changed => &mut self.changed,
            PathChangeKind::None => return,
        };
        table.entry(parent.to_path_buf()).or_default().push(name);

        for ancestor in parent.ancestors() {
            if !self.affected.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn kind(&self, path: &Path) -> PathChangeKind {
        self.entries
            .get(path)
            .copied()
            .unwrap_or(PathChangeKind::None)
    }

    pub fn entries(&self) -> impl Iterator<Item = PathChangeEntry> + '_ {
        self.entries
            .iter()
            .map(|(path, kind)| PathChangeEntry::new(path.clone(), *kind))
    }

    pub fn created_children(&self, directory: &Path) -> &[String] {
        self.created.get(directory).map_or(&[], Vec::as_slice)
    }

    pub fn deleted_children(&self, directory: &Path) -> &[String] {
        self.deleted.get(directory).map_or(&[], Vec::as_slice)
    }

    pub fn changed_children(&self, directory: &Path) -> &[String] {
        self.changed.get(directory).map_or(&[], Vec::as_slice)
    }

    /// True if any change was recorded at or below `directory`.
    pub fn is_affected(&self, directory: &Path) -> bool {
        self.affected.contains(directory)
    }

    /// True if any change is recorded anywhere under `root`.
    pub fn touches(&self, root: &Path) -> bool {
        self.is_affected(root) || self.entries.contains_key(root)
    }
}

/// The slice of a [`FullPathChanges`] that falls under one project root.
#[derive(Debug, Clone, Copy)]
pub struct ProjectPathChanges<'a> {
    root: &'a Path,
    changes: &'a FullPathChanges,
}

impl<'a> ProjectPathChanges<'a> {
    pub fn new(root: &'a Path, changes: &'a FullPathChanges) -> Self {
        Self { root, changes }
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        !self.changes.touches(self.root)
    }

    pub fn full(&self) -> &'a FullPathChanges {
        self.changes
    }

    /// Kind recorded for `path`, which must be under the root.
    pub fn kind(&self, path: &Path) -> PathChangeKind {
        if path.starts_with(self.root) {
            self.changes.kind(path)
        } else {
            PathChangeKind::None
        }
    }
}
