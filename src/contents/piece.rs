use super::file_contents::FileContents;
use crate::paths::FileName;
use std::ops::Range;
use std::sync::Arc;

/// Contiguous range of one file's contents; the unit of parallel search.
#[derive(Debug, Clone)]
pub struct FileContentsPiece {
    pub file_id: usize,
    pub file_name: FileName,
    pub contents: Arc<FileContents>,
    /// Character range within `contents`.
    pub range: Range<usize>,
}

impl FileContentsPiece {
    /// Bytes scanned when searching this piece.
    pub fn weight(&self) -> usize {
        self.range.len() * self.contents.character_width().bytes()
    }
}

/// Split `contents` into pieces of at most `chunk_size` bytes. Searchable
/// contents always produce at least one piece, even when empty.
pub fn split_into_pieces(
    file_id: usize,
    file_name: &FileName,
    contents: &Arc<FileContents>,
    chunk_size: usize,
) -> Vec<FileContentsPiece> {
    if !contents.is_searchable() {
        return Vec::new();
    }
    let chunk = (chunk_size / contents.character_width().bytes()).max(1);
    let len = contents.char_length();
    let piece = |range| FileContentsPiece {
        file_id,
        file_name: file_name.clone(),
        contents: Arc::clone(contents),
        range,
    };
    if len == 0 {
        return vec![piece(0..0)];
    }
    (0..len)
        .step_by(chunk)
        .map(|start| piece(start..(start + chunk).min(len)))
        .collect()
}
