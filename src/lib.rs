//! # codesnap - in-memory, live-updating code search
//!
//! codesnap keeps every text file of a set of projects in memory and
//! answers substring, whole-word and regular expression searches over them
//! in parallel, while a file system watcher keeps the index current.
//!
//! ## Architecture
//!
//! - [`paths`] - Structurally shared directory and file names
//! - [`project`] - Project roots and their include/exclude filters
//! - [`snapshot`] - Immutable file tree snapshots, incrementally updated
//! - [`contents`] - Loaded file contents, encoding detection and pieces
//! - [`database`] - The searchable file database built from a tree snapshot
//! - [`search`] - Literal and regex matchers for narrow and wide text
//! - [`engine`] - Query execution, extracts, statistics and the server facade
//! - [`watch`] - File system notifications turned into change batches
//! - [`output`] - ripgrep-style result formatting
//! - [`utils`] - Task queue, progress indicators and logging
//!
//! ## Quick Start
//!
//! ```no_run
//! use codesnap::config::EngineConfig;
//! use codesnap::engine::{IndexServer, SearchParams};
//! use codesnap::project::FileProjectDiscovery;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let server = IndexServer::new(EngineConfig::default(), Arc::new(FileProjectDiscovery::new()));
//! server.register_root(Path::new("/path/to/project")).unwrap();
//! server.wait_until_idle();
//!
//! let result = server.search_file_contents(&SearchParams::new("fn main")).unwrap();
//! for file in &result.files {
//!     println!("{}: {} matches", file.file_name, file.spans.len());
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod contents;
pub mod database;
pub mod engine;
pub mod error;
pub mod output;
pub mod paths;
pub mod project;
pub mod search;
pub mod snapshot;
pub mod utils;
pub mod watch;

pub use error::{Error, Result};
