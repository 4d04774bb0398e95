use super::changes::{FullPathChanges, PathChangeEntry, PathChangeKind};
use super::types::FileSystemTreeSnapshot;
use crate::project::ProjectDiscovery;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// What a batch of path changes means for the current snapshot.
#[derive(Debug, Clone)]
pub enum ChangeClassification {
    /// Nothing relevant to any project happened.
    NoChanges,
    /// Only the contents of known searchable files changed. The tree is
    /// unaffected.
    FileModificationsOnly(Vec<PathBuf>),
    /// Structural changes the tree builder can apply incrementally.
    VariousFileChanges(FullPathChanges),
    /// Project definitions may have changed; everything must be rebuilt.
    UnknownChanges,
}

/// Classify `entries` against `snapshot`.
///
/// Paths outside every project, and paths excluded by a project's filters,
/// are dropped. Deletions are kept even when the filters would reject the
/// path, since the path may have been included under older rules.
pub fn classify_changes(
    snapshot: &FileSystemTreeSnapshot,
    discovery: &dyn ProjectDiscovery,
    entries: &[PathChangeEntry],
) -> ChangeClassification {
    if entries.iter().any(|e| discovery.is_project_file(&e.path)) {
        debug!("project definition changed");
        return ChangeClassification::UnknownChanges;
    }

    let relevant: Vec<&PathChangeEntry> = entries
        .iter()
        .filter(|e| e.kind != PathChangeKind::None && is_relevant(snapshot, e))
        .collect();
    if relevant.is_empty() {
        return ChangeClassification::NoChanges;
    }

    let mut modified = Vec::new();
    let mut structural = false;
    for entry in &relevant {
        if entry.kind != PathChangeKind::Changed {
            structural = true;
            break;
        }
        let is_dir = fs::metadata(&entry.path).map(|m| m.is_dir());
        if snapshot.find_file(&entry.path).is_some() {
            if matches!(is_dir, Ok(true)) {
                // A file replaced by a directory.
                structural = true;
                break;
            }
            modified.push(entry.path.clone());
        } else if snapshot.find_directory(&entry.path).is_some() {
            if matches!(is_dir, Ok(false)) {
                // A directory replaced by a file.
                structural = true;
                break;
            }
        } else {
            // A change to a path we never saw: the tree needs it.
            structural = true;
            break;
        }
    }

    if structural {
        let changes = FullPathChanges::new(relevant.into_iter().cloned());
        if changes.is_empty() {
            return ChangeClassification::NoChanges;
        }
        return ChangeClassification::VariousFileChanges(changes);
    }

    modified.retain(|path| is_searchable(snapshot, path));
    if modified.is_empty() {
        ChangeClassification::NoChanges
    } else {
        modified.sort();
        modified.dedup();
        ChangeClassification::FileModificationsOnly(modified)
    }
}

fn is_relevant(snapshot: &FileSystemTreeSnapshot, entry: &PathChangeEntry) -> bool {
    let Some(root) = snapshot.project_for_path(&entry.path) else {
        return false;
    };
    let project = &root.project;
    let Some(relative) = project.relative_path(&entry.path) else {
        return false;
    };
    if relative.as_os_str().is_empty() {
        return entry.kind != PathChangeKind::Changed;
    }

    // Every ancestor directory must be walked by the project.
    let mut prefix = PathBuf::new();
    let components: Vec<Component<'_>> = relative.components().collect();
    for component in &components[..components.len() - 1] {
        prefix.push(component);
        if !project.is_directory_included(&prefix) {
            return false;
        }
    }

    entry.kind == PathChangeKind::Deleted
        || project.is_file_included(relative)
        || project.is_directory_included(relative)
}

fn is_searchable(snapshot: &FileSystemTreeSnapshot, path: &Path) -> bool {
    snapshot
        .project_for_path(path)
        .and_then(|root| {
            root.project
                .relative_path(path)
                .map(|relative| root.project.is_searchable(relative))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::DirectoryName;
    use crate::project::Project;
    use crate::snapshot::types::{DirectorySnapshot, ProjectRootSnapshot};
    use std::sync::Arc;

    struct NoDiscovery;

    impl ProjectDiscovery for NoDiscovery {
        fn get_project(&self, _path: &Path) -> Option<Arc<Project>> {
            None
        }

        fn is_project_file(&self, path: &Path) -> bool {
            path.file_name().is_some_and(|n| n == "codesnap.project")
        }

        fn invalidate(&self) {}
    }

    fn snapshot() -> FileSystemTreeSnapshot {
        let root = DirectoryName::new_root("/p");
        let mut dir = DirectorySnapshot::empty(root.clone(), false);
        dir.files = vec![root.child_file("a.txt"), root.child_file("b.bin")];
        dir.sort_children();
        FileSystemTreeSnapshot {
            version: 1,
            projects: vec![ProjectRootSnapshot {
                project: Arc::new(Project::with_defaults("/p").unwrap()),
                directory: Arc::new(dir),
            }],
        }
    }

    fn classify(entries: &[PathChangeEntry]) -> ChangeClassification {
        classify_changes(&snapshot(), &NoDiscovery, entries)
    }

    #[test]
    fn outside_paths_are_ignored() {
        let result = classify(&[PathChangeEntry::new("/q/x.txt", PathChangeKind::Created)]);
        assert!(matches!(result, ChangeClassification::NoChanges));
    }

    #[test]
    fn ignored_directories_are_dropped() {
        let result = classify(&[PathChangeEntry::new(
            "/p/.git/index",
            PathChangeKind::Changed,
        )]);
        assert!(matches!(result, ChangeClassification::NoChanges));
    }

    #[test]
    fn modification_of_known_file() {
        match classify(&[PathChangeEntry::new("/p/a.txt", PathChangeKind::Changed)]) {
            ChangeClassification::FileModificationsOnly(files) => {
                assert_eq!(files, vec![PathBuf::from("/p/a.txt")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn creation_is_structural() {
        let result = classify(&[PathChangeEntry::new("/p/c.txt", PathChangeKind::Created)]);
        assert!(matches!(result, ChangeClassification::VariousFileChanges(_)));
    }

    #[test]
    fn deletion_is_never_dropped() {
        let result = classify(&[PathChangeEntry::new("/p/a.txt", PathChangeKind::Deleted)]);
        match result {
            ChangeClassification::VariousFileChanges(changes) => {
                assert_eq!(changes.kind(Path::new("/p/a.txt")), PathChangeKind::Deleted);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn project_file_change_is_unknown() {
        let result = classify(&[PathChangeEntry::new(
            "/p/codesnap.project",
            PathChangeKind::Changed,
        )]);
        assert!(matches!(result, ChangeClassification::UnknownChanges));
    }

    #[test]
    fn file_turned_directory_is_structural() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir(temp.path().join("x")).unwrap();
        let root = DirectoryName::new_root(temp.path());
        let mut dir = DirectorySnapshot::empty(root.clone(), false);
        dir.files = vec![root.child_file("x")];
        let snapshot = FileSystemTreeSnapshot {
            version: 1,
            projects: vec![ProjectRootSnapshot {
                project: Arc::new(Project::with_defaults(temp.path()).unwrap()),
                directory: Arc::new(dir),
            }],
        };

        let result = classify_changes(
            &snapshot,
            &NoDiscovery,
            &[PathChangeEntry::new(temp.path().join("x"), PathChangeKind::Changed)],
        );
        assert!(matches!(result, ChangeClassification::VariousFileChanges(_)));
    }
}
