use super::bndm::{Bndm, MAX_PATTERN_LEN};
use super::horspool::Horspool;
use super::regex_search::RegexSearch;
use super::utf16::Utf16Search;
use super::{FilePositionSpan, SearchOptions, SearchProgress};
use crate::contents::{CharacterWidth, FileContents, FileContentsPiece};
use crate::error::{Error, Result};
use std::sync::atomic::Ordering;

#[derive(Debug, Clone)]
enum Matcher {
    Bndm(Bndm),
    Horspool(Horspool),
    Regex(RegexSearch),
    Utf16(Utf16Search),
}

/// A pattern compiled for one character width.
#[derive(Debug, Clone)]
pub struct CompiledTextSearch {
    pattern: String,
    options: SearchOptions,
    matcher: Matcher,
}

/// Compile `pattern`.
///
/// Literal byte patterns of up to 64 bytes use BNDM, longer ones
/// Boyer–Moore–Horspool. Regular expressions are only supported for
/// one-byte contents.
pub fn compile_search(pattern: &str, options: &SearchOptions) -> Result<CompiledTextSearch> {
    if pattern.is_empty() {
        return Err(Error::InvalidPattern("empty pattern".to_string()));
    }
    let matcher = match (options.character_width, options.use_regex) {
        (CharacterWidth::One, true) => Matcher::Regex(RegexSearch::new(
            pattern,
            options.match_case,
            options.match_whole_word,
            options.regex_engine,
        )?),
        (CharacterWidth::One, false) if pattern.len() <= MAX_PATTERN_LEN => {
            Bndm::new(pattern.as_bytes(), options.match_case)
                .map(Matcher::Bndm)
                .ok_or_else(|| Error::InvalidPattern(pattern.to_string()))?
        }
        (CharacterWidth::One, false) => Horspool::new(pattern.as_bytes(), options.match_case)
            .map(Matcher::Horspool)
            .ok_or_else(|| Error::InvalidPattern(pattern.to_string()))?,
        (CharacterWidth::Two, true) => {
            return Err(Error::InvalidPattern(
                "regular expressions are not supported for UTF-16 contents".to_string(),
            ));
        }
        (CharacterWidth::Two, false) => Utf16Search::new(pattern, options.match_case)
            .map(Matcher::Utf16)
            .ok_or_else(|| Error::InvalidPattern(pattern.to_string()))?,
    };
    Ok(CompiledTextSearch {
        pattern: pattern.to_string(),
        options: options.clone(),
        matcher,
    })
}

#[inline]
fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte >= 0x80
}

#[inline]
fn is_word_unit(unit: u16) -> bool {
    if unit < 0x80 {
        is_word_byte(unit as u8)
    } else {
        true
    }
}

/// Drop matches that start inside the previous one.
fn push_non_overlapping(spans: &mut Vec<FilePositionSpan>, start: usize, length: usize) {
    if let Some(last) = spans.last() {
        if start < last.position + last.length {
            return;
        }
    }
    spans.push(FilePositionSpan::new(start, length));
}

impl CompiledTextSearch {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Every match inside the piece range, in character units relative to
    /// the start of the contents.
    ///
    /// Matches crossing the end of the piece are not reported.
    pub fn find_all(
        &self,
        piece: &FileContentsPiece,
        progress: &SearchProgress,
    ) -> Vec<FilePositionSpan> {
        if progress.token.is_cancelled() {
            return Vec::new();
        }
        progress.pieces.fetch_add(1, Ordering::Relaxed);
        let range = piece.range.clone();
        let whole_word = self.options.match_whole_word;
        let mut spans = Vec::new();

        match (&self.matcher, piece.contents.as_ref()) {
            (Matcher::Utf16(search), FileContents::Utf16(c)) => {
                let text = c.text();
                let len = search.len();
                search.find_all(&text[range.clone()], |offset| {
                    let start = range.start + offset;
                    let end = start + len;
                    if whole_word
                        && (start > 0 && is_word_unit(text[start - 1])
                            || end < text.len() && is_word_unit(text[end]))
                    {
                        return;
                    }
                    push_non_overlapping(&mut spans, start, len);
                });
            }
            (Matcher::Utf16(_), _) => {}
            (_, FileContents::Ascii(c)) => {
                let text = c.text();
                let window = &text[range.clone()];
                let mut literal = |offset: usize, len: usize| {
                    let start = range.start + offset;
                    let end = start + len;
                    if whole_word
                        && (start > 0 && is_word_byte(text[start - 1])
                            || end < text.len() && is_word_byte(text[end]))
                    {
                        return;
                    }
                    push_non_overlapping(&mut spans, start, len);
                };
                match &self.matcher {
                    Matcher::Bndm(m) => m.find_all(window, |offset| literal(offset, m.len())),
                    Matcher::Horspool(m) => m.find_all(window, |offset| literal(offset, m.len())),
                    Matcher::Regex(re) => re.find_all(text, range.clone(), |start, end| {
                        spans.push(FilePositionSpan::new(start, end - start));
                    }),
                    Matcher::Utf16(_) => {}
                }
            }
            _ => {}
        }

        progress.matches.fetch_add(spans.len(), Ordering::Relaxed);
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::split_into_pieces;
    use crate::paths::DirectoryName;
    use crate::search::RegexEngine;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn piece(bytes: &[u8]) -> FileContentsPiece {
        let contents = Arc::new(FileContents::from_bytes(
            bytes.to_vec(),
            SystemTime::UNIX_EPOCH,
            8192,
        ));
        let name = DirectoryName::new_root("/p").child_file("f.txt");
        split_into_pieces(0, &name, &contents, 1 << 20).remove(0)
    }

    fn positions(pattern: &str, options: &SearchOptions, bytes: &[u8]) -> Vec<usize> {
        let search = compile_search(pattern, options).unwrap();
        search
            .find_all(&piece(bytes), &SearchProgress::default())
            .iter()
            .map(|s| s.position)
            .collect()
    }

    #[test]
    fn literal_algorithms_agree() {
        let unit = "0123456789";
        let long = unit.repeat(10);
        let short = "foo";
        let text = format!("{long} {short} x {long}{short}");
        let options = SearchOptions::default();

        let long_hits = positions(&long, &options, text.as_bytes());
        assert_eq!(long_hits, vec![0, 107]);
        let short_hits = positions(short, &options, text.as_bytes());
        assert_eq!(short_hits, vec![101, 207]);
    }

    #[test]
    fn whole_word() {
        let options = SearchOptions {
            match_whole_word: true,
            ..SearchOptions::default()
        };
        assert_eq!(positions("foo", &options, b"foo food _foo foo."), vec![0, 14]);
    }

    #[test]
    fn non_overlapping_literals() {
        assert_eq!(positions("aa", &SearchOptions::default(), b"aaaaa"), vec![0, 2]);
    }

    #[test]
    fn regex_sees_text_before_piece() {
        let contents = Arc::new(FileContents::from_bytes(
            b"xxfoo\n".to_vec(),
            SystemTime::UNIX_EPOCH,
            8192,
        ));
        let name = DirectoryName::new_root("/p").child_file("f.txt");
        let pieces = split_into_pieces(0, &name, &contents, 2);
        let progress = SearchProgress::default();
        let anchored = SearchOptions {
            use_regex: true,
            match_case: true,
            ..SearchOptions::default()
        };
        let word = SearchOptions {
            match_whole_word: true,
            ..anchored.clone()
        };
        for (pattern, options) in [("^fo", &anchored), ("fo", &word)] {
            let search = compile_search(pattern, options).unwrap();
            let found: Vec<FilePositionSpan> = pieces
                .iter()
                .flat_map(|p| search.find_all(p, &progress))
                .collect();
            assert!(found.is_empty(), "{pattern}: {found:?}");
        }
    }

    #[test]
    fn stays_inside_piece_range() {
        let contents = Arc::new(FileContents::from_bytes(
            b"foo foo foo".to_vec(),
            SystemTime::UNIX_EPOCH,
            8192,
        ));
        let name = DirectoryName::new_root("/p").child_file("f.txt");
        let pieces = split_into_pieces(0, &name, &contents, 6);
        let search = compile_search("foo", &SearchOptions::default()).unwrap();
        let progress = SearchProgress::default();
        let found: Vec<usize> = pieces
            .iter()
            .flat_map(|p| search.find_all(p, &progress))
            .map(|s| s.position)
            .collect();
        // The second match crosses the first seam.
        assert_eq!(found, vec![0, 8]);
    }

    #[test]
    fn utf16_contents() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hello world".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let options = SearchOptions {
            character_width: CharacterWidth::Two,
            ..SearchOptions::default()
        };
        assert_eq!(positions("world", &options, &bytes), vec![6]);
        // One-byte matcher never looks at UTF-16 contents.
        assert!(positions("world", &SearchOptions::default(), &bytes).is_empty());
    }

    #[test]
    fn regex_rejected_for_utf16() {
        let options = SearchOptions {
            use_regex: true,
            character_width: CharacterWidth::Two,
            ..SearchOptions::default()
        };
        assert!(compile_search("a.b", &options).is_err());
    }

    #[test]
    fn regex_search() {
        let options = SearchOptions {
            use_regex: true,
            regex_engine: RegexEngine::Backtracking,
            ..SearchOptions::default()
        };
        assert_eq!(positions(r"b\w+", &options, b"abc bcd"), vec![1, 4]);
    }

    #[test]
    fn cancelled_progress_finds_nothing() {
        let tracker = crate::cancel::VersionTracker::new();
        let progress = SearchProgress::new(tracker.next_token());
        tracker.cancel_all();
        let search = compile_search("foo", &SearchOptions::default()).unwrap();
        assert!(search.find_all(&piece(b"foo"), &progress).is_empty());
    }
}
