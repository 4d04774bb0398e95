//! Engine configuration.
//!
//! Values are resolved with priority: environment variables > config file >
//! defaults. The config file lives at `<config dir>/codesnap/config.toml`.

use crate::database::BuildOptions;
use crate::contents::LoadOptions;
use crate::error::{Error, Result};
use crate::search::RegexEngine;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "codesnap";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_PARTIAL_PROGRESS_MS: u64 = 1000;
pub const DEFAULT_SNIFF_LIMIT: usize = 8 * 1024;
pub const DEFAULT_MAX_RESULTS: usize = 10_000;
pub const DEFAULT_EXTRACT_MAX_LENGTH: usize = 160;
/// Debounce window for watcher events in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Configuration file format (TOML). Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub index: IndexConfigFile,
    #[serde(default)]
    pub search: SearchConfigFile,
    #[serde(default)]
    pub watcher: WatcherConfigFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexConfigFile {
    pub chunk_size: Option<usize>,
    pub max_file_size: Option<u64>,
    pub partial_progress_interval_ms: Option<u64>,
    pub sniff_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfigFile {
    pub max_results: Option<usize>,
    pub extract_max_length: Option<usize>,
    pub regex_engine: Option<RegexEngine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatcherConfigFile {
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum piece size in bytes.
    pub chunk_size: usize,
    /// Larger files are not loaded.
    pub max_file_size: u64,
    pub partial_progress_interval_ms: u64,
    pub sniff_limit: usize,
    pub max_results: usize,
    pub extract_max_length: usize,
    pub regex_engine: RegexEngine,
    pub debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            partial_progress_interval_ms: DEFAULT_PARTIAL_PROGRESS_MS,
            sniff_limit: DEFAULT_SNIFF_LIMIT,
            max_results: DEFAULT_MAX_RESULTS,
            extract_max_length: DEFAULT_EXTRACT_MAX_LENGTH,
            regex_engine: RegexEngine::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Default location of the config file, if a config directory exists.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

impl EngineConfig {
    /// Load from the default config file and the environment. A missing or
    /// unreadable file falls back to defaults.
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Some(file) = config_path().and_then(|p| Self::read_file(&p).ok()) {
            config.apply_file(&file);
        }
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load from an explicit config file. Unlike [`load`](Self::load), a
    /// file that cannot be read or parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.apply_file(&Self::read_file(path)?);
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ConfigFile> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(v) = file.index.chunk_size {
            self.chunk_size = v.max(1);
        }
        if let Some(v) = file.index.max_file_size {
            self.max_file_size = v;
        }
        if let Some(v) = file.index.partial_progress_interval_ms {
            self.partial_progress_interval_ms = v;
        }
        if let Some(v) = file.index.sniff_limit {
            self.sniff_limit = v;
        }
        if let Some(v) = file.search.max_results {
            self.max_results = v;
        }
        if let Some(v) = file.search.extract_max_length {
            self.extract_max_length = v;
        }
        if let Some(v) = file.search.regex_engine {
            self.regex_engine = v;
        }
        if let Some(v) = file.watcher.debounce_ms {
            self.debounce_ms = v;
        }
    }

    /// Apply `CODESNAP_*` overrides; unparsable values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("CODESNAP_CHUNK_SIZE").and_then(|v| v.parse::<usize>().ok()) {
            self.chunk_size = v.max(1);
        }
        if let Some(v) = var("CODESNAP_MAX_FILE_SIZE").and_then(|v| v.parse().ok()) {
            self.max_file_size = v;
        }
        if let Some(v) = var("CODESNAP_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.debounce_ms = v;
        }
        if let Some(v) = var("CODESNAP_MAX_RESULTS").and_then(|v| v.parse().ok()) {
            self.max_results = v;
        }
    }

    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            max_file_size: self.max_file_size,
            sniff_limit: self.sniff_limit,
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            load: self.load_options(),
            chunk_size: self.chunk_size,
            partial_interval: Duration::from_millis(self.partial_progress_interval_ms),
            ..BuildOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_defaults() {
        let file = EngineConfig::parse(
            r#"
            [index]
            chunk_size = 4096

            [search]
            regex_engine = "backtracking"
            "#,
        )
        .unwrap();
        let mut config = EngineConfig::default();
        config.apply_file(&file);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.regex_engine, RegexEngine::Backtracking);
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn env_overrides_file() {
        let file = EngineConfig::parse("[watcher]\ndebounce_ms = 50\n").unwrap();
        let mut config = EngineConfig::default();
        config.apply_file(&file);
        config.apply_env(|key| match key {
            "CODESNAP_DEBOUNCE_MS" => Some("75".to_string()),
            "CODESNAP_MAX_RESULTS" => Some("not a number".to_string()),
            _ => None,
        });
        assert_eq!(config.debounce_ms, 75);
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn invalid_file_is_config_error() {
        assert!(matches!(
            EngineConfig::parse("[index]\nchunk_size = \"big\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::parse("[unknown]\nx = 1"),
            Err(Error::Config(_))
        ));
    }
}
