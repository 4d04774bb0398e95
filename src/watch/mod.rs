//! Turning raw file system notifications into change batches.

pub mod debouncer;
pub mod watcher;

pub use debouncer::EventDebouncer;
pub use watcher::DirectoryWatcher;
