use crate::contents::FileContents;
use crate::database::FileDatabaseSnapshot;
use crate::paths::FileName;
use crate::snapshot::FileSystemTreeSnapshot;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatistics {
    pub root: PathBuf,
    pub directories: usize,
    pub files: usize,
    pub searchable_files: usize,
    pub searchable_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionStatistics {
    pub extension: String,
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LargeFile {
    pub file_name: FileName,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatistics {
    pub tree_version: u64,
    pub database_version: u64,
    pub complete: bool,
    pub project_count: usize,
    pub directory_count: usize,
    pub file_count: usize,
    pub searchable_file_count: usize,
    /// Bytes of searchable contents held in memory.
    pub searchable_bytes: u64,
    pub binary_file_count: usize,
    pub piece_count: usize,
    pub partition_count: usize,
    /// Sorted by bytes, largest first.
    pub extensions: Vec<ExtensionStatistics>,
    pub largest_files: Vec<LargeFile>,
    pub projects: Vec<ProjectStatistics>,
}

impl DatabaseStatistics {
    pub fn compute(
        tree: &FileSystemTreeSnapshot,
        database: &FileDatabaseSnapshot,
        top_files: usize,
    ) -> Self {
        let mut extensions: FxHashMap<String, ExtensionStatistics> = FxHashMap::default();
        let mut largest: Vec<LargeFile> = Vec::new();
        let mut binary_file_count = 0;
        let mut per_root: FxHashMap<PathBuf, (usize, u64)> = FxHashMap::default();

        for file in database.files() {
            let Some(contents) = &file.contents else {
                continue;
            };
            if let FileContents::Binary(_) = contents.as_ref() {
                binary_file_count += 1;
                continue;
            }
            let bytes = contents.byte_length() as u64;
            let extension = file.file_name.extension().unwrap_or_default();
            let entry = extensions
                .entry(extension.clone())
                .or_insert_with(|| ExtensionStatistics {
                    extension,
                    files: 0,
                    bytes: 0,
                });
            entry.files += 1;
            entry.bytes += bytes;

            let root = per_root.entry(file.file_name.root().full_path()).or_default();
            root.0 += 1;
            root.1 += bytes;

            largest.push(LargeFile {
                file_name: file.file_name.clone(),
                bytes,
            });
        }

        let mut extensions: Vec<_> = extensions.into_values().collect();
        extensions.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.extension.cmp(&b.extension)));
        largest.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.file_name.cmp(&b.file_name)));
        largest.truncate(top_files);

        let projects = tree
            .projects
            .iter()
            .map(|p| {
                let root = p.project.root_path().to_path_buf();
                let (searchable_files, searchable_bytes) =
                    per_root.get(&root).copied().unwrap_or_default();
                ProjectStatistics {
                    directories: p.directory.directory_count(),
                    files: p.directory.file_count(),
                    searchable_files,
                    searchable_bytes,
                    root,
                }
            })
            .collect();

        Self {
            tree_version: tree.version,
            database_version: database.version(),
            complete: database.is_complete(),
            project_count: tree.projects.len(),
            directory_count: tree.directory_count(),
            file_count: tree.file_count(),
            searchable_file_count: database.searchable_file_count(),
            searchable_bytes: database.searchable_bytes() as u64,
            binary_file_count,
            piece_count: database.partitions().iter().map(Vec::len).sum(),
            partition_count: database.partitions().len(),
            extensions,
            largest_files: largest,
            projects,
        }
    }
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
