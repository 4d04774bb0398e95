//! Search engine and the server facade that owns every component.

pub mod extracts;
pub mod search_engine;
pub mod server;
pub mod stats;

pub use extracts::{FileExtract, get_file_extracts};
pub use search_engine::{
    FileSearchResult, NameSearchParams, NameSearchResult, SearchEngine, SearchFileContentsResult,
    SearchParams,
};
pub use server::IndexServer;
pub use stats::{DatabaseStatistics, ExtensionStatistics, ProjectStatistics, format_size};
