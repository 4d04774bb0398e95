use super::file_contents::FileContents;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Files larger than this are not loaded and become placeholders.
    pub max_file_size: u64,
    /// Bytes examined by the encoding sniffer.
    pub sniff_limit: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024,
            sniff_limit: 8 * 1024,
        }
    }
}

/// Last write time of `path`, or `None` if it cannot be read.
pub fn last_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Read `path` into memory.
///
/// Never fails: unreadable, oversized and binary files all produce a
/// non-searchable placeholder so one bad file cannot abort a build.
pub fn load_file_contents(path: &Path, options: &LoadOptions) -> FileContents {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot stat file");
            return FileContents::binary(0, SystemTime::UNIX_EPOCH);
        }
    };
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    if metadata.len() > options.max_file_size {
        debug!(path = %path.display(), size = metadata.len(), "file too large to index");
        return FileContents::binary(metadata.len(), modified);
    }

    match fs::read(path) {
        Ok(bytes) => FileContents::from_bytes(bytes, modified, options.sniff_limit),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot read file");
            FileContents::binary(metadata.len(), modified)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        let contents = load_file_contents(&path, &LoadOptions::default());
        assert!(contents.is_searchable());
        assert_eq!(contents.char_length(), 5);
        assert_eq!(Some(contents.last_modified()), last_modified(&path));
    }

    #[test]
    fn missing_file_is_placeholder() {
        let dir = TempDir::new().unwrap();
        let contents = load_file_contents(&dir.path().join("nope"), &LoadOptions::default());
        assert!(!contents.is_searchable());
        assert_eq!(contents.file_size(), 0);
    }

    #[test]
    fn oversized_file_is_placeholder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "0123456789").unwrap();
        let options = LoadOptions {
            max_file_size: 4,
            ..LoadOptions::default()
        };
        let contents = load_file_contents(&path, &options);
        assert!(!contents.is_searchable());
        assert_eq!(contents.file_size(), 10);
    }
}
