use crate::contents::{FileContents, FileContentsPiece};
use crate::paths::{DirectoryName, FileName};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// A file of the database and its loaded contents, if any.
#[derive(Debug, Clone)]
pub struct FileWithContents {
    pub file_name: FileName,
    /// `None` for files the project does not search.
    pub contents: Option<Arc<FileContents>>,
    /// At or below a symbolic link; freshness needs a stat.
    pub under_symlink: bool,
}

impl FileWithContents {
    pub fn is_searchable(&self) -> bool {
        self.contents.as_ref().is_some_and(|c| c.is_searchable())
    }
}

/// Frozen, queryable view of every file and its contents.
///
/// The name-to-slot index is shared between a snapshot and the snapshots
/// derived from it by a targeted update, which only replace slots.
#[derive(Debug, Clone, Default)]
pub struct FileDatabaseSnapshot {
    pub(crate) version: u64,
    pub(crate) complete: bool,
    pub(crate) roots: Vec<DirectoryName>,
    pub(crate) project_hashes: FxHashMap<DirectoryName, u64>,
    pub(crate) directories: Arc<Vec<DirectoryName>>,
    pub(crate) file_index: Arc<FxHashMap<FileName, usize>>,
    pub(crate) files: Vec<FileWithContents>,
    pub(crate) partitions: Vec<Vec<FileContentsPiece>>,
}

impl FileDatabaseSnapshot {
    pub fn empty() -> Self {
        Self {
            complete: true,
            ..Self::default()
        }
    }

    /// Version of the file system snapshot this database was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// False for the partial snapshots published while contents load.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn roots(&self) -> &[DirectoryName] {
        &self.roots
    }

    pub fn project_hash(&self, root: &DirectoryName) -> Option<u64> {
        self.project_hashes.get(root).copied()
    }

    /// Every directory, sorted.
    pub fn directories(&self) -> &[DirectoryName] {
        &self.directories
    }

    /// Every file, sorted by name.
    pub fn files(&self) -> &[FileWithContents] {
        &self.files
    }

    pub fn file(&self, name: &FileName) -> Option<&FileWithContents> {
        self.file_index.get(name).map(|&slot| &self.files[slot])
    }

    pub fn slot(&self, name: &FileName) -> Option<usize> {
        self.file_index.get(name).copied()
    }

    pub fn file_by_slot(&self, slot: usize) -> Option<&FileWithContents> {
        self.files.get(slot)
    }

    /// Known file at absolute `path`.
    pub fn find_file(&self, path: &Path) -> Option<&FileWithContents> {
        let root = self
            .roots
            .iter()
            .filter(|root| path.starts_with(root.name()))
            .max_by_key(|root| root.name().len())?;
        let relative = path.strip_prefix(root.name()).ok()?;
        let file_name = relative.file_name()?.to_string_lossy();
        let parent = match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => root.descendant(parent)?,
            _ => root.clone(),
        };
        self.file(&parent.child_file(&file_name))
    }

    pub fn contains_directory(&self, name: &DirectoryName) -> bool {
        self.directories.binary_search(name).is_ok()
    }

    pub fn partitions(&self) -> &[Vec<FileContentsPiece>] {
        &self.partitions
    }

    pub fn searchable_files(&self) -> impl Iterator<Item = &FileWithContents> {
        self.files.iter().filter(|f| f.is_searchable())
    }

    pub fn searchable_file_count(&self) -> usize {
        self.searchable_files().count()
    }

    /// Bytes of searchable contents held in memory.
    pub fn searchable_bytes(&self) -> usize {
        self.searchable_files()
            .filter_map(|f| f.contents.as_ref())
            .map(|c| c.byte_length())
            .sum()
    }
}
