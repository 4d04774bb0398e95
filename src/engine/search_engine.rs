//! Queries over a [`FileDatabaseSnapshot`]: file contents, file names and
//! directory names.

use crate::cancel::{CancellationToken, VersionTracker};
use crate::contents::CharacterWidth;
use crate::database::FileDatabaseSnapshot;
use crate::error::{Error, Result};
use crate::paths::{DirectoryName, FileName, NAME_COMPARER, PathComparer};
use crate::search::{
    CompiledTextSearch, FilePositionSpan, RegexEngine, SearchOptions, SearchProgress,
    compile_search,
};
use globset::{GlobBuilder, GlobMatcher};
use lru::LruCache;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::debug;

const COMPILED_CACHE_SIZE: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub search_string: String,
    pub match_case: bool,
    pub match_whole_word: bool,
    pub use_regex: bool,
    /// Engine for regular expressions. `None` uses the automaton, or the
    /// configured default when searching through `IndexServer`.
    pub regex_engine: Option<RegexEngine>,
    /// Maximum number of spans returned. Zero means no limit.
    pub max_results: usize,
    /// Glob restricting the files searched, matched against the path
    /// relative to the project root or against the file name.
    pub file_path_pattern: Option<String>,
}

impl SearchParams {
    pub fn new(search_string: impl Into<String>) -> Self {
        Self {
            search_string: search_string.into(),
            ..Self::default()
        }
    }

    fn options(&self, character_width: CharacterWidth) -> SearchOptions {
        SearchOptions {
            match_case: self.match_case,
            match_whole_word: self.match_whole_word,
            use_regex: self.use_regex,
            regex_engine: self.regex_engine.unwrap_or_default(),
            character_width,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSearchResult {
    pub file_name: FileName,
    pub spans: Vec<FilePositionSpan>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFileContentsResult {
    pub files: Vec<FileSearchResult>,
    /// Every match found, including the ones not returned.
    pub total_matches: usize,
    pub returned_matches: usize,
    /// Files actually scanned.
    pub searched_files: usize,
    pub hit_max_results: bool,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameSearchParams {
    /// Substring, or a glob when it contains `*` or `?`.
    pub pattern: String,
    pub match_case: bool,
    /// Zero means no limit.
    pub max_results: usize,
}

impl NameSearchParams {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NameSearchResult<T> {
    pub names: Vec<T>,
    /// Matches before applying the result cap.
    pub total: usize,
}

/// A compiled query for both character widths. Regular expressions have no
/// wide form.
struct CompiledQuery {
    narrow: CompiledTextSearch,
    wide: Option<CompiledTextSearch>,
}

type CacheKey = (String, SearchOptions);

pub struct SearchEngine {
    versions: VersionTracker,
    compiled: Mutex<LruCache<CacheKey, Arc<CompiledQuery>>>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(COMPILED_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            versions: VersionTracker::new(),
            compiled: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn compile(&self, params: &SearchParams) -> Result<Arc<CompiledQuery>> {
        let narrow_options = params.options(CharacterWidth::One);
        let key = (params.search_string.clone(), narrow_options.clone());
        if let Some(query) = self.compiled.lock().get(&key) {
            return Ok(Arc::clone(query));
        }
        let narrow = compile_search(&params.search_string, &narrow_options)?;
        let wide = if params.use_regex {
            None
        } else {
            Some(compile_search(
                &params.search_string,
                &params.options(CharacterWidth::Two),
            )?)
        };
        let query = Arc::new(CompiledQuery { narrow, wide });
        self.compiled.lock().put(key, Arc::clone(&query));
        Ok(query)
    }

    /// Cancel every search in progress.
    pub fn cancel(&self) {
        self.versions.cancel_all();
    }

    /// Search the contents of every searchable file.
    ///
    /// Starting a search cancels the previous one, which then returns
    /// [`Error::Cancelled`]. Queries of one character or less return an
    /// empty result without scanning.
    pub fn search_file_contents(
        &self,
        database: &FileDatabaseSnapshot,
        params: &SearchParams,
    ) -> Result<SearchFileContentsResult> {
        if params.search_string.chars().count() <= 1 {
            return Ok(SearchFileContentsResult::default());
        }
        let token = self.versions.next_token();
        self.search_contents_with(database, params, token)
    }

    fn search_contents_with(
        &self,
        database: &FileDatabaseSnapshot,
        params: &SearchParams,
        token: CancellationToken,
    ) -> Result<SearchFileContentsResult> {
        let started = Instant::now();
        let query = self.compile(params)?;
        let filter = params
            .file_path_pattern
            .as_deref()
            .map(|pattern| compile_glob(pattern, true))
            .transpose()?;
        let included = |name: &FileName| match &filter {
            Some(glob) => glob.is_match(name.relative_path()) || glob.is_match(name.name()),
            None => true,
        };

        let progress = SearchProgress::new(token.clone());
        let hits: Vec<(usize, Vec<FilePositionSpan>)> = database
            .partitions()
            .par_iter()
            .flat_map_iter(|partition| {
                let mut found = Vec::new();
                for piece in partition {
                    if progress.token.is_cancelled() {
                        break;
                    }
                    if !included(&piece.file_name) {
                        continue;
                    }
                    let search = match piece.contents.character_width() {
                        CharacterWidth::One => Some(&query.narrow),
                        CharacterWidth::Two => query.wide.as_ref(),
                    };
                    let Some(search) = search else {
                        continue;
                    };
                    let spans = search.find_all(piece, &progress);
                    if !spans.is_empty() {
                        found.push((piece.file_id, spans));
                    }
                }
                found
            })
            .collect();
        token.check()?;

        let mut by_file: FxHashMap<usize, Vec<FilePositionSpan>> = FxHashMap::default();
        for (file_id, spans) in hits {
            by_file.entry(file_id).or_default().extend(spans);
        }
        let mut per_file: Vec<(usize, Vec<FilePositionSpan>)> = by_file.into_iter().collect();
        per_file.sort_by_key(|(file_id, _)| *file_id);

        let total_matches = progress.matches.load(Ordering::Relaxed);
        let limit = if params.max_results == 0 {
            usize::MAX
        } else {
            params.max_results
        };
        let mut result = SearchFileContentsResult {
            total_matches,
            searched_files: database
                .searchable_files()
                .filter(|f| included(&f.file_name))
                .count(),
            ..SearchFileContentsResult::default()
        };
        for (file_id, mut spans) in per_file {
            let remaining = limit - result.returned_matches;
            if remaining == 0 {
                result.hit_max_results = true;
                break;
            }
            let Some(file) = database.file_by_slot(file_id) else {
                continue;
            };
            spans.sort();
            if spans.len() > remaining {
                spans.truncate(remaining);
                result.hit_max_results = true;
            }
            result.returned_matches += spans.len();
            result.files.push(FileSearchResult {
                file_name: file.file_name.clone(),
                spans,
            });
        }
        result.elapsed = started.elapsed();
        debug!(
            pattern = %params.search_string,
            files = result.files.len(),
            total_matches = result.total_matches,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "content search finished"
        );
        // A newer search may have started while the results were grouped.
        token.check()?;
        Ok(result)
    }

    pub fn search_file_names(
        &self,
        database: &FileDatabaseSnapshot,
        params: &NameSearchParams,
    ) -> Result<NameSearchResult<FileName>> {
        let matcher = NameMatcher::new(params)?;
        let matches: Vec<FileName> = database
            .files()
            .par_iter()
            .filter(|f| matcher.is_match(&f.file_name.relative_path(), f.file_name.name()))
            .map(|f| f.file_name.clone())
            .collect();
        Ok(cap(matches, params.max_results))
    }

    pub fn search_directory_names(
        &self,
        database: &FileDatabaseSnapshot,
        params: &NameSearchParams,
    ) -> Result<NameSearchResult<DirectoryName>> {
        let matcher = NameMatcher::new(params)?;
        let matches: Vec<DirectoryName> = database
            .directories()
            .par_iter()
            .filter(|d| !d.is_root() && matcher.is_match(&d.relative_path(), d.name()))
            .cloned()
            .collect();
        Ok(cap(matches, params.max_results))
    }
}

fn cap<T>(mut names: Vec<T>, max_results: usize) -> NameSearchResult<T> {
    let total = names.len();
    if max_results > 0 {
        names.truncate(max_results);
    }
    NameSearchResult { names, total }
}

fn compile_glob(pattern: &str, match_case: bool) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .case_insensitive(!match_case || NAME_COMPARER == PathComparer::CaseInsensitive)
        .literal_separator(false)
        .build()?
        .compile_matcher())
}

enum NameMatcher {
    Glob(GlobMatcher),
    Substring { needle: String, match_case: bool },
}

impl NameMatcher {
    fn new(params: &NameSearchParams) -> Result<Self> {
        if params.pattern.is_empty() {
            return Err(Error::InvalidPattern("empty pattern".to_string()));
        }
        if params.pattern.contains(['*', '?']) {
            return Ok(NameMatcher::Glob(compile_glob(&params.pattern, params.match_case)?));
        }
        let needle = if params.match_case {
            params.pattern.clone()
        } else {
            params.pattern.to_lowercase()
        };
        Ok(NameMatcher::Substring {
            needle,
            match_case: params.match_case,
        })
    }

    fn is_match(&self, relative: &Path, name: &str) -> bool {
        match self {
            NameMatcher::Glob(glob) => glob.is_match(relative) || glob.is_match(name),
            NameMatcher::Substring { needle, match_case } => {
                let haystack = relative.to_string_lossy();
                if *match_case {
                    haystack.contains(needle.as_str())
                } else {
                    haystack.to_lowercase().contains(needle.as_str())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{BuildOptions, FileDatabaseBuilder};
    use crate::project::Project;
    use crate::snapshot::{DirectorySnapshotBuilder, FileSystemTreeSnapshot, ProjectRootSnapshot};
    use std::fs;
    use tempfile::TempDir;

    fn database(files: &[(&str, &str)]) -> (TempDir, FileDatabaseSnapshot) {
        let dir = TempDir::new().unwrap();
        for (path, text) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let project = Arc::new(Project::with_defaults(dir.path()).unwrap());
        let token = CancellationToken::noop();
        let directory = DirectorySnapshotBuilder::new(&project, &token)
            .full_scan()
            .unwrap();
        let tree = FileSystemTreeSnapshot {
            version: 1,
            projects: vec![ProjectRootSnapshot { project, directory }],
        };
        let db = FileDatabaseBuilder::new(BuildOptions::default())
            .build(&FileDatabaseSnapshot::empty(), &tree, None, &token, &|_| {})
            .unwrap();
        (dir, db)
    }

    #[test]
    fn superseded_search_returns_cancelled() {
        let (_dir, db) = database(&[("a.txt", "foo bar foo")]);
        let engine = SearchEngine::new();
        let older = engine.versions.next_token();

        let newer = engine
            .search_file_contents(&db, &SearchParams::new("bar"))
            .unwrap();
        assert_eq!(newer.returned_matches, 1);

        let stale = engine.search_contents_with(&db, &SearchParams::new("foo"), older);
        assert!(matches!(stale, Err(Error::Cancelled)));
    }

    #[test]
    fn cancel_stops_search_in_flight() {
        let (_dir, db) = database(&[("a.txt", "foo bar foo")]);
        let engine = SearchEngine::new();
        let token = engine.versions.next_token();
        engine.cancel();
        let result = engine.search_contents_with(&db, &SearchParams::new("foo"), token);
        assert!(matches!(result, Err(Error::Cancelled)));

        // The next search starts a fresh generation.
        let result = engine
            .search_file_contents(&db, &SearchParams::new("foo"))
            .unwrap();
        assert_eq!(result.returned_matches, 2);
    }

    #[test]
    fn finds_matches_per_file() {
        let (_dir, db) = database(&[("a.txt", "foo bar foo"), ("b.txt", "nothing"), ("c.txt", "FOO")]);
        let engine = SearchEngine::new();
        let result = engine
            .search_file_contents(&db, &SearchParams::new("foo"))
            .unwrap();
        assert_eq!(result.files.len(), 2);
        assert_eq!(result.files[0].spans, vec![
            FilePositionSpan::new(0, 3),
            FilePositionSpan::new(8, 3)
        ]);
        assert_eq!(result.total_matches, 3);
        assert_eq!(result.searched_files, 3);
    }

    #[test]
    fn match_case() {
        let (_dir, db) = database(&[("a.txt", "foo FOO")]);
        let params = SearchParams {
            match_case: true,
            ..SearchParams::new("FOO")
        };
        let result = SearchEngine::new().search_file_contents(&db, &params).unwrap();
        assert_eq!(result.files[0].spans, vec![FilePositionSpan::new(4, 3)]);
    }

    #[test]
    fn short_queries_are_rejected() {
        let (_dir, db) = database(&[("a.txt", "aaaa")]);
        let result = SearchEngine::new()
            .search_file_contents(&db, &SearchParams::new("a"))
            .unwrap();
        assert!(result.files.is_empty());
        assert_eq!(result.total_matches, 0);
    }

    #[test]
    fn results_are_capped_but_counted() {
        let (_dir, db) = database(&[("a.txt", "ab ab ab"), ("b.txt", "ab ab")]);
        let params = SearchParams {
            max_results: 4,
            ..SearchParams::new("ab")
        };
        let result = SearchEngine::new().search_file_contents(&db, &params).unwrap();
        assert_eq!(result.returned_matches, 4);
        assert_eq!(result.total_matches, 5);
        assert!(result.hit_max_results);
    }

    #[test]
    fn file_path_pattern_restricts_files() {
        let (_dir, db) = database(&[("src/a.rs", "needle"), ("b.txt", "needle")]);
        let params = SearchParams {
            file_path_pattern: Some("*.rs".to_string()),
            ..SearchParams::new("needle")
        };
        let result = SearchEngine::new().search_file_contents(&db, &params).unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].file_name.name(), "a.rs");
        assert_eq!(result.searched_files, 1);
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let (_dir, db) = database(&[("a.txt", "x")]);
        let params = SearchParams {
            use_regex: true,
            ..SearchParams::new("(ab")
        };
        let result = SearchEngine::new().search_file_contents(&db, &params);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn name_search() {
        let (_dir, db) = database(&[("src/main.rs", ""), ("src/lib.rs", ""), ("docs/guide.md", "")]);
        let engine = SearchEngine::new();

        let rs = engine
            .search_file_names(&db, &NameSearchParams::new("*.rs"))
            .unwrap();
        assert_eq!(rs.total, 2);

        let sub = engine
            .search_file_names(&db, &NameSearchParams::new("GUIDE"))
            .unwrap();
        assert_eq!(sub.names.len(), 1);

        let dirs = engine
            .search_directory_names(&db, &NameSearchParams::new("src"))
            .unwrap();
        assert_eq!(dirs.names.len(), 1);
        assert_eq!(dirs.names[0].name(), "src");
    }
}
