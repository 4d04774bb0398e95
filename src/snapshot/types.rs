use crate::paths::{DirectoryName, FileName, NAME_COMPARER};
use crate::project::Project;
use std::path::{Component, Path};
use std::sync::Arc;

/// Immutable view of one directory. Child lists are sorted with
/// [`NAME_COMPARER`]; directories and files are kept in separate lists.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySnapshot {
    pub name: DirectoryName,
    /// The directory was reached through a symbolic link. Contents under it
    /// can change without the watcher noticing.
    pub is_symlink: bool,
    pub directories: Vec<Arc<DirectorySnapshot>>,
    pub files: Vec<FileName>,
}

impl DirectorySnapshot {
    pub fn empty(name: DirectoryName, is_symlink: bool) -> Self {
        Self {
            name,
            is_symlink,
            directories: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn sort_children(&mut self) {
        self.directories
            .sort_by(|a, b| NAME_COMPARER.compare(a.name.name(), b.name.name()));
        self.files
            .sort_by(|a, b| NAME_COMPARER.compare(a.name(), b.name()));
    }

    pub fn child_directory(&self, name: &str) -> Option<&Arc<DirectorySnapshot>> {
        self.directories
            .binary_search_by(|d| NAME_COMPARER.compare(d.name.name(), name))
            .ok()
            .map(|i| &self.directories[i])
    }

    pub fn child_file(&self, name: &str) -> Option<&FileName> {
        self.files
            .binary_search_by(|f| NAME_COMPARER.compare(f.name(), name))
            .ok()
            .map(|i| &self.files[i])
    }

    /// Directory at `relative` below this one.
    pub fn find_directory(&self, relative: &Path) -> Option<&DirectorySnapshot> {
        let mut current = self;
        for component in relative.components() {
            match component {
                Component::Normal(name) => {
                    current = current.child_directory(name.to_str()?)?;
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(current)
    }

    /// File at `relative` below this directory.
    pub fn find_file(&self, relative: &Path) -> Option<&FileName> {
        let name = relative.file_name()?.to_str()?;
        let parent = relative.parent().unwrap_or(Path::new(""));
        self.find_directory(parent)?.child_file(name)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .directories
                .iter()
                .map(|d| d.file_count())
                .sum::<usize>()
    }

    pub fn directory_count(&self) -> usize {
        1 + self
            .directories
            .iter()
            .map(|d| d.directory_count())
            .sum::<usize>()
    }

    /// Visit every directory depth-first, parents before children. The flag
    /// tells whether the directory is at or below a symbolic link.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a DirectorySnapshot, bool)) {
        self.visit_inner(false, visitor);
    }

    fn visit_inner<'a>(
        &'a self,
        under_symlink: bool,
        visitor: &mut impl FnMut(&'a DirectorySnapshot, bool),
    ) {
        let under_symlink = under_symlink || self.is_symlink;
        visitor(self, under_symlink);
        for child in &self.directories {
            child.visit_inner(under_symlink, visitor);
        }
    }
}

/// A project together with its scanned tree.
#[derive(Debug, Clone)]
pub struct ProjectRootSnapshot {
    pub project: Arc<Project>,
    pub directory: Arc<DirectorySnapshot>,
}

/// Versioned set of project trees. Published as a whole and never mutated
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct FileSystemTreeSnapshot {
    pub version: u64,
    pub projects: Vec<ProjectRootSnapshot>,
}

impl FileSystemTreeSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Project whose root is the longest prefix of `path`.
    pub fn project_for_path(&self, path: &Path) -> Option<&ProjectRootSnapshot> {
        self.projects
            .iter()
            .filter(|p| path.starts_with(p.project.root_path()))
            .max_by(|a, b| {
                let la = a.project.root_path().as_os_str().len();
                let lb = b.project.root_path().as_os_str().len();
                la.cmp(&lb)
            })
    }

    pub fn find_project(&self, root_path: &Path) -> Option<&ProjectRootSnapshot> {
        self.projects
            .iter()
            .find(|p| p.project.root_path() == root_path)
    }

    /// Known file at absolute `path`.
    pub fn find_file(&self, path: &Path) -> Option<&FileName> {
        let root = self.project_for_path(path)?;
        let relative = root.project.relative_path(path)?;
        root.directory.find_file(relative)
    }

    /// Known directory at absolute `path`.
    pub fn find_directory(&self, path: &Path) -> Option<&DirectorySnapshot> {
        let root = self.project_for_path(path)?;
        let relative = root.project.relative_path(path)?;
        root.directory.find_directory(relative)
    }

    pub fn file_count(&self) -> usize {
        self.projects.iter().map(|p| p.directory.file_count()).sum()
    }

    pub fn directory_count(&self) -> usize {
        self.projects
            .iter()
            .map(|p| p.directory.directory_count())
            .sum()
    }

    pub fn sort_projects(&mut self) {
        self.projects
            .sort_by(|a, b| a.project.root().cmp(b.project.root()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample() -> DirectorySnapshot {
        let root = DirectoryName::new_root("/p");
        let src = root.child_directory("src");
        let mut src_snapshot = DirectorySnapshot::empty(src.clone(), false);
        src_snapshot.files = vec![src.child_file("b.rs"), src.child_file("a.rs")];
        src_snapshot.sort_children();

        let mut snapshot = DirectorySnapshot::empty(root.clone(), false);
        snapshot.directories.push(Arc::new(src_snapshot));
        snapshot.files.push(root.child_file("README.md"));
        snapshot
    }

    #[test]
    fn find_file_and_directory() {
        let snapshot = sample();
        let file = snapshot.find_file(Path::new("src/a.rs")).unwrap();
        assert_eq!(file.relative_path(), PathBuf::from("src/a.rs"));
        assert!(snapshot.find_directory(Path::new("src")).is_some());
        assert!(snapshot.find_file(Path::new("src/c.rs")).is_none());
    }

    #[test]
    fn counts() {
        let snapshot = sample();
        assert_eq!(snapshot.file_count(), 3);
        assert_eq!(snapshot.directory_count(), 2);
    }

    #[test]
    fn children_are_sorted() {
        let snapshot = sample();
        let names: Vec<_> = snapshot.directories[0].files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.rs", "b.rs"]);
    }
}
