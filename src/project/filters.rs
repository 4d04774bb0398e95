//! Path filters built from gitignore-style pattern lists.

use crate::error::{Error, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Capability consumed by the snapshot builder and the database builder.
/// Paths are relative to the project root.
pub trait PathFilter: Send + Sync {
    fn matches_directory(&self, relative: &Path) -> bool;
    fn matches_file(&self, relative: &Path) -> bool;
}

/// A compiled list of gitignore-style patterns.
pub struct PatternSet {
    matcher: Gitignore,
    len: usize,
}

impl PatternSet {
    pub fn new<'a>(root: &Path, patterns: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        let mut len = 0;
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            builder
                .add_line(None, pattern)
                .map_err(|e| Error::InvalidPattern(format!("{}: {}", pattern, e)))?;
            len += 1;
        }
        let matcher = builder
            .build()
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;
        Ok(Self { matcher, len })
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Match `relative` itself only.
    pub fn is_match(&self, relative: &Path, is_dir: bool) -> bool {
        self.matcher.matched(relative, is_dir).is_ignore()
    }

    /// Match `relative` or any of its parent directories.
    pub fn is_match_or_parent(&self, relative: &Path, is_dir: bool) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }
}

/// Directory-tree filter: everything not explicitly ignored is kept.
pub struct IgnoreFilter {
    ignore: PatternSet,
}

impl IgnoreFilter {
    pub fn new(ignore: PatternSet) -> Self {
        Self { ignore }
    }
}

impl PathFilter for IgnoreFilter {
    fn matches_directory(&self, relative: &Path) -> bool {
        !self.ignore.is_match(relative, true)
    }

    fn matches_file(&self, relative: &Path) -> bool {
        !self.ignore.is_match(relative, false)
    }
}

/// Content-search filter: a file is searchable when it is included and not
/// ignored. An empty include list includes everything.
pub struct SearchableFilter {
    include: PatternSet,
    ignore: PatternSet,
}

impl SearchableFilter {
    pub fn new(include: PatternSet, ignore: PatternSet) -> Self {
        Self { include, ignore }
    }
}

impl PathFilter for SearchableFilter {
    fn matches_directory(&self, relative: &Path) -> bool {
        !self.ignore.is_match_or_parent(relative, true)
    }

    fn matches_file(&self, relative: &Path) -> bool {
        let included = self.include.is_empty() || self.include.is_match_or_parent(relative, false);
        included && !self.ignore.is_match_or_parent(relative, false)
    }
}

/// Filter accepting every path.
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn matches_directory(&self, _relative: &Path) -> bool {
        true
    }

    fn matches_file(&self, _relative: &Path) -> bool {
        true
    }
}
