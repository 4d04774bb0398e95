//! The index server: one file system snapshot manager feeding one file
//! database manager, and a search engine over the current database.

use super::extracts::{FileExtract, get_file_extracts};
use super::search_engine::{
    NameSearchParams, NameSearchResult, SearchEngine, SearchFileContentsResult, SearchParams,
};
use super::stats::DatabaseStatistics;
use crate::config::EngineConfig;
use crate::database::{DatabaseListener, FileDatabaseBuilder, FileDatabaseManager, FileDatabaseSnapshot};
use crate::error::{Error, Result};
use crate::paths::{DirectoryName, FileName};
use crate::project::ProjectDiscovery;
use crate::search::FilePositionSpan;
use crate::snapshot::{FileSystemSnapshotManager, FileSystemTreeSnapshot, PathChangeEntry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Number of files listed in [`DatabaseStatistics::largest_files`].
const STATISTICS_TOP_FILES: usize = 10;

pub struct IndexServer {
    config: EngineConfig,
    snapshots: FileSystemSnapshotManager,
    database: Arc<FileDatabaseManager>,
    engine: SearchEngine,
}

impl IndexServer {
    pub fn new(config: EngineConfig, discovery: Arc<dyn ProjectDiscovery>) -> Self {
        let database = Arc::new(FileDatabaseManager::new(FileDatabaseBuilder::new(
            config.build_options(),
        )));
        let snapshots = FileSystemSnapshotManager::new(discovery);
        snapshots.set_listener(database.clone());
        Self {
            config,
            snapshots,
            database,
            engine: SearchEngine::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_database_listener(&self, listener: Arc<dyn DatabaseListener>) {
        self.database.set_listener(listener);
    }

    /// Start indexing the project containing `path`. Returns the canonical
    /// path and whether it was newly registered.
    pub fn register_root(&self, path: &Path) -> Result<(PathBuf, bool)> {
        let root = fs::canonicalize(path).map_err(|_| Error::InvalidRoot(path.to_path_buf()))?;
        if !root.is_dir() {
            return Err(Error::InvalidRoot(path.to_path_buf()));
        }
        let added = self.snapshots.register_root(&root);
        if added {
            info!(root = %root.display(), "root registered");
        }
        Ok((root, added))
    }

    pub fn unregister_root(&self, path: &Path) -> bool {
        let root = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.snapshots.unregister_root(&root)
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.snapshots.roots()
    }

    /// Rescan every project from disk.
    pub fn refresh(&self) {
        self.snapshots.refresh();
    }

    pub fn pause(&self) {
        self.snapshots.pause();
    }

    pub fn resume(&self) {
        self.snapshots.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.snapshots.is_paused()
    }

    /// Block until every scheduled tree and database rebuild is done.
    pub fn wait_until_idle(&self) {
        self.snapshots.flush();
        self.database.flush();
    }

    /// Entry point for file system change notifications.
    pub fn apply_path_changes(&self, changes: Vec<PathChangeEntry>) {
        self.snapshots.apply_path_changes(changes);
    }

    pub fn current_snapshot(&self) -> Arc<FileSystemTreeSnapshot> {
        self.snapshots.current_snapshot()
    }

    pub fn current_database(&self) -> Arc<FileDatabaseSnapshot> {
        self.database.current_database()
    }

    /// Search file contents. A zero `max_results` and an unset regex
    /// engine take the configured defaults.
    pub fn search_file_contents(&self, params: &SearchParams) -> Result<SearchFileContentsResult> {
        let params = self.with_defaults(params);
        self.engine.search_file_contents(&self.current_database(), &params)
    }

    fn with_defaults(&self, params: &SearchParams) -> SearchParams {
        SearchParams {
            max_results: match params.max_results {
                0 => self.config.max_results,
                n => n,
            },
            regex_engine: params.regex_engine.or(Some(self.config.regex_engine)),
            ..params.clone()
        }
    }

    pub fn search_file_names(&self, params: &NameSearchParams) -> Result<NameSearchResult<FileName>> {
        self.engine.search_file_names(&self.current_database(), params)
    }

    pub fn search_directory_names(
        &self,
        params: &NameSearchParams,
    ) -> Result<NameSearchResult<DirectoryName>> {
        self.engine
            .search_directory_names(&self.current_database(), params)
    }

    pub fn get_file_extracts(
        &self,
        path: &Path,
        spans: &[FilePositionSpan],
    ) -> Result<Vec<FileExtract>> {
        get_file_extracts(
            &self.current_database(),
            path,
            spans,
            self.config.extract_max_length,
        )
    }

    pub fn statistics(&self) -> DatabaseStatistics {
        DatabaseStatistics::compute(
            &self.current_snapshot(),
            &self.current_database(),
            STATISTICS_TOP_FILES,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FileProjectDiscovery;
    use crate::search::RegexEngine;
    use crate::snapshot::PathChangeKind;
    use tempfile::TempDir;

    fn server() -> IndexServer {
        IndexServer::new(EngineConfig::default(), Arc::new(FileProjectDiscovery::new()))
    }

    #[test]
    fn index_and_search() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        let server = server();
        let (root, added) = server.register_root(dir.path()).unwrap();
        assert!(added);
        server.wait_until_idle();

        let result = server
            .search_file_contents(&SearchParams::new("world"))
            .unwrap();
        assert_eq!(result.files.len(), 1);
        let extracts = server
            .get_file_extracts(&root.join("a.txt"), &result.files[0].spans)
            .unwrap();
        assert_eq!(extracts[0].text, "hello world");
        assert_eq!(server.statistics().file_count, 1);
    }

    #[test]
    fn configured_defaults_fill_unset_params() {
        let config = EngineConfig {
            max_results: 7,
            regex_engine: RegexEngine::Backtracking,
            ..EngineConfig::default()
        };
        let server = IndexServer::new(config, Arc::new(FileProjectDiscovery::new()));

        let filled = server.with_defaults(&SearchParams::new("foo"));
        assert_eq!(filled.max_results, 7);
        assert_eq!(filled.regex_engine, Some(RegexEngine::Backtracking));

        let explicit = SearchParams {
            max_results: 3,
            regex_engine: Some(RegexEngine::Automaton),
            ..SearchParams::new("foo")
        };
        let kept = server.with_defaults(&explicit);
        assert_eq!(kept.max_results, 3);
        assert_eq!(kept.regex_engine, Some(RegexEngine::Automaton));
    }

    #[test]
    fn invalid_root() {
        let dir = TempDir::new().unwrap();
        let result = server().register_root(&dir.path().join("missing"));
        assert!(matches!(result, Err(Error::InvalidRoot(_))));
    }

    #[test]
    fn changes_flow_through_to_search() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "old text").unwrap();
        let server = server();
        let (root, _) = server.register_root(dir.path()).unwrap();
        server.wait_until_idle();

        fs::write(root.join("b.txt"), "new text").unwrap();
        server.apply_path_changes(vec![PathChangeEntry::new(
            root.join("b.txt"),
            PathChangeKind::Created,
        )]);
        server.wait_until_idle();

        let result = server.search_file_contents(&SearchParams::new("new")).unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].file_name.name(), "b.txt");
    }
}
