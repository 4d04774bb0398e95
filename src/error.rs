use std::path::PathBuf;

/// Errors surfaced by the index and search core.
///
/// Per-file read or stat failures never show up here: they are absorbed by
/// the loader and the directory walker and the item is skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid root path: {0}")]
    InvalidRoot(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::InvalidPattern(e.to_string())
    }
}

impl From<globset::Error> for Error {
    fn from(e: globset::Error) -> Self {
        Error::InvalidPattern(e.to_string())
    }
}
