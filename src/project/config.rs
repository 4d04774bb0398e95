//! `codesnap.project` files.
//!
//! ```text
//! [explorer.ignore]
//! .git/
//! build/
//!
//! [search.ignore]
//! *.min.js
//!
//! [search.include]
//! *
//! ```

use rustc_hash::FxHasher;
use std::hash::Hasher;

pub const PROJECT_FILE_NAME: &str = "codesnap.project";

/// Directories skipped when a project has no explicit explorer rules.
pub const DEFAULT_EXPLORER_IGNORE: &[&str] = &[
    ".git/",
    "node_modules/",
    "target/",
    "__pycache__/",
    ".venv/",
    "venv/",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub explorer_ignore: Vec<String>,
    pub search_ignore: Vec<String>,
    pub search_include: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            explorer_ignore: DEFAULT_EXPLORER_IGNORE.iter().map(|s| s.to_string()).collect(),
            search_ignore: Vec::new(),
            search_include: vec!["*".to_string()],
        }
    }
}

impl ProjectConfig {
    /// Parse a project file. Unknown sections are ignored; sections that are
    /// absent keep their defaults.
    pub fn parse(text: &str) -> Self {
        #[derive(Clone, Copy)]
        enum Section {
            ExplorerIgnore,
            SearchIgnore,
            SearchInclude,
            Unknown,
        }

        let mut explorer_ignore: Option<Vec<String>> = None;
        let mut search_ignore: Option<Vec<String>> = None;
        let mut search_include: Option<Vec<String>> = None;
        let mut current = Section::Unknown;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                let section = line[1..line.len() - 1].trim().to_ascii_lowercase();
                current = match section.as_str() {
                    "explorer.ignore" => Section::ExplorerIgnore,
                    "search.ignore" => Section::SearchIgnore,
                    "search.include" => Section::SearchInclude,
                    _ => Section::Unknown,
                };
                // An empty section still overrides the default.
                match current {
                    Section::ExplorerIgnore => {
                        explorer_ignore.get_or_insert_with(Vec::new);
                    }
                    Section::SearchIgnore => {
                        search_ignore.get_or_insert_with(Vec::new);
                    }
                    Section::SearchInclude => {
                        search_include.get_or_insert_with(Vec::new);
                    }
                    Section::Unknown => {}
                }
                continue;
            }
            let list = match current {
                Section::ExplorerIgnore => explorer_ignore.as_mut(),
                Section::SearchIgnore => search_ignore.as_mut(),
                Section::SearchInclude => search_include.as_mut(),
                Section::Unknown => None,
            };
            if let Some(list) = list {
                list.push(line.to_string());
            }
        }

        let defaults = Self::default();
        Self {
            explorer_ignore: explorer_ignore.unwrap_or(defaults.explorer_ignore),
            search_ignore: search_ignore.unwrap_or(defaults.search_ignore),
            search_include: search_include.unwrap_or(defaults.search_include),
        }
    }

    /// Hash of the effective rules. Two configs with the same rules hash the
    /// same regardless of comments or layout in the source file.
    pub fn version_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for (tag, list) in [
            (1u8, &self.explorer_ignore),
            (2u8, &self.search_ignore),
            (3u8, &self.search_include),
        ] {
            hasher.write_u8(tag);
            for pattern in list {
                hasher.write(pattern.as_bytes());
                hasher.write_u8(0);
            }
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sections() {
        let config = ProjectConfig::parse(
            r#"
# project rules
[explorer.ignore]
out/

[search.ignore]
*.min.js

[search.include]
*.rs
*.md
"#,
        );
        assert_eq!(config.explorer_ignore, vec!["out/"]);
        assert_eq!(config.search_ignore, vec!["*.min.js"]);
        assert_eq!(config.search_include, vec!["*.rs", "*.md"]);
    }

    #[test]
    fn missing_sections_keep_defaults() {
        let config = ProjectConfig::parse("[search.ignore]\n*.log\n");
        assert_eq!(config.explorer_ignore.len(), DEFAULT_EXPLORER_IGNORE.len());
        assert_eq!(config.search_include, vec!["*"]);
    }

    #[test]
    fn version_hash_ignores_layout() {
        let a = ProjectConfig::parse("[search.ignore]\n*.log\n");
        let b = ProjectConfig::parse("# comment\n\n[search.ignore]\n   *.log   \n");
        let c = ProjectConfig::parse("[search.ignore]\n*.tmp\n");
        assert_eq!(a.version_hash(), b.version_hash());
        assert_ne!(a.version_hash(), c.version_hash());
    }
}
