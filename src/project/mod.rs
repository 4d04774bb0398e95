//! Projects: a root directory plus the filters that decide what is walked
//! and what is searched.

pub mod config;
pub mod discovery;
pub mod filters;

pub use config::{PROJECT_FILE_NAME, ProjectConfig};
pub use discovery::{FileProjectDiscovery, ProjectDiscovery};
pub use filters::{AcceptAll, IgnoreFilter, PathFilter, PatternSet, SearchableFilter};

use crate::error::Result;
use crate::paths::DirectoryName;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Project {
    root: DirectoryName,
    root_path: PathBuf,
    directory_filter: Arc<dyn PathFilter>,
    file_filter: Arc<dyn PathFilter>,
    searchable_filter: Arc<dyn PathFilter>,
    version_hash: u64,
}

impl Project {
    pub fn new(
        root_path: impl Into<PathBuf>,
        directory_filter: Arc<dyn PathFilter>,
        file_filter: Arc<dyn PathFilter>,
        searchable_filter: Arc<dyn PathFilter>,
        version_hash: u64,
    ) -> Self {
        let root_path = root_path.into();
        Self {
            root: DirectoryName::new_root(&root_path),
            root_path,
            directory_filter,
            file_filter,
            searchable_filter,
            version_hash,
        }
    }

    pub fn from_config(root_path: impl Into<PathBuf>, config: &ProjectConfig) -> Result<Self> {
        let root_path = root_path.into();
        let explorer = Arc::new(IgnoreFilter::new(PatternSet::new(
            &root_path,
            config.explorer_ignore.iter().map(String::as_str),
        )?));
        let searchable = Arc::new(SearchableFilter::new(
            PatternSet::new(&root_path, config.search_include.iter().map(String::as_str))?,
            PatternSet::new(&root_path, config.search_ignore.iter().map(String::as_str))?,
        ));
        Ok(Self::new(
            root_path,
            explorer.clone(),
            explorer,
            searchable,
            config.version_hash(),
        ))
    }

    /// Project rooted at `root_path` with the default rules.
    pub fn with_defaults(root_path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(root_path, &ProjectConfig::default())
    }

    pub fn root(&self) -> &DirectoryName {
        &self.root
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn version_hash(&self) -> u64 {
        self.version_hash
    }

    pub fn is_directory_included(&self, relative: &Path) -> bool {
        self.directory_filter.matches_directory(relative)
    }

    pub fn is_file_included(&self, relative: &Path) -> bool {
        self.file_filter.matches_file(relative)
    }

    pub fn is_searchable(&self, relative: &Path) -> bool {
        self.searchable_filter.matches_file(relative)
    }

    /// Path of `absolute` relative to this project's root, if it is inside.
    pub fn relative_path<'a>(&self, absolute: &'a Path) -> Option<&'a Path> {
        absolute.strip_prefix(&self.root_path).ok()
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("root_path", &self.root_path)
            .field("version_hash", &self.version_hash)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_project_skips_vcs_directories() {
        let project = Project::with_defaults("/p").unwrap();
        assert!(!project.is_directory_included(Path::new(".git")));
        assert!(!project.is_directory_included(Path::new("sub/node_modules")));
        assert!(project.is_directory_included(Path::new("src")));
        assert!(project.is_searchable(Path::new("src/lib.rs")));
    }

    #[test]
    fn relative_path_inside_and_outside() {
        let project = Project::with_defaults("/p").unwrap();
        assert_eq!(project.relative_path(Path::new("/p/a/b.rs")), Some(Path::new("a/b.rs")));
        assert_eq!(project.relative_path(Path::new("/q/a.rs")), None);
    }
}
