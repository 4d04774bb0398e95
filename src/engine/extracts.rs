use crate::database::FileDatabaseSnapshot;
use crate::error::{Error, Result};
use crate::search::FilePositionSpan;
use serde::Serialize;
use std::ops::Range;
use std::path::Path;

/// Printable text around one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileExtract {
    /// One-based line of the match start.
    pub line_number: usize,
    /// One-based column of the match start, in characters.
    pub column_number: usize,
    pub text: String,
    /// Character offset of the match within `text`.
    pub match_offset: usize,
    /// Match length in characters; clipped to `text`.
    pub match_length: usize,
}

/// Extracts for `spans` of the file at `path`, one per span.
///
/// Lines longer than `max_length` are cut to a window around the match.
pub fn get_file_extracts(
    database: &FileDatabaseSnapshot,
    path: &Path,
    spans: &[FilePositionSpan],
    max_length: usize,
) -> Result<Vec<FileExtract>> {
    let file = database
        .find_file(path)
        .ok_or_else(|| Error::NotFound(path.to_path_buf()))?;
    let Some(contents) = file.contents.as_ref().filter(|c| c.is_searchable()) else {
        return Ok(Vec::new());
    };
    let max_length = max_length.max(1);

    let mut extracts = Vec::with_capacity(spans.len());
    for span in spans {
        if span.position > contents.char_length() {
            continue;
        }
        let line = contents.position_of(span.position).0;
        let Some(line_range) = contents.line_range(line) else {
            continue;
        };
        let match_end = span.end().min(line_range.end).max(span.position);

        let (mut start, mut end) = if line_range.len() <= max_length {
            (line_range.start, line_range.end)
        } else {
            let match_len = match_end - span.position;
            let context = max_length.saturating_sub(match_len) / 2;
            let start = span.position.saturating_sub(context).max(line_range.start);
            let end = (start + max_length).min(line_range.end);
            let start = end.saturating_sub(max_length).max(line_range.start);
            (start, end)
        };
        // Never cut a multi-unit character in half.
        while start > line_range.start && !contents.is_char_boundary(start) {
            start -= 1;
        }
        while end > start && !contents.is_char_boundary(end) {
            end -= 1;
        }
        let match_start = span.position.clamp(start, end);
        let match_end = match_end.clamp(match_start, end);

        let chars = |range: Range<usize>| contents.text_slice(range).chars().count();
        extracts.push(FileExtract {
            line_number: line + 1,
            column_number: chars(line_range.start..span.position) + 1,
            text: contents.text_slice(start..end).into_owned(),
            match_offset: chars(start..match_start),
            match_length: chars(match_start..match_end),
        });
    }
    Ok(extracts)
}
