//! In-memory contents of one file.

use super::kind::{FileKind, sniff};
use memchr::memchr_iter;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::Hasher;
use std::ops::Range;
use std::sync::OnceLock;
use std::time::SystemTime;

/// Width of one character unit in a contents buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CharacterWidth {
    #[default]
    One,
    Two,
}

impl CharacterWidth {
    pub fn bytes(self) -> usize {
        match self {
            CharacterWidth::One => 1,
            CharacterWidth::Two => 2,
        }
    }
}

/// Byte-addressed text: ASCII and UTF-8 (with or without BOM).
pub struct AsciiContents {
    buffer: Vec<u8>,
    /// Start of the text inside `buffer`, past any byte order mark.
    offset: usize,
    last_modified: SystemTime,
    line_starts: OnceLock<Vec<usize>>,
}

impl AsciiContents {
    pub fn text(&self) -> &[u8] {
        &self.buffer[self.offset..]
    }
}

/// UTF-16 text, decoded to native-endian code units.
pub struct Utf16Contents {
    units: Vec<u16>,
    file_size: u64,
    last_modified: SystemTime,
    line_starts: OnceLock<Vec<usize>>,
}

impl Utf16Contents {
    pub fn text(&self) -> &[u16] {
        &self.units
    }
}

/// Placeholder for files that are not searched: binary, too large, or
/// unreadable. Keeps the on-disk size for reporting.
pub struct BinaryContents {
    file_size: u64,
    last_modified: SystemTime,
}

pub enum FileContents {
    Ascii(AsciiContents),
    Utf16(Utf16Contents),
    Binary(BinaryContents),
}

impl FileContents {
    /// Contents for `bytes` as read from disk. `sniff_limit` bounds the
    /// prefix inspected to decide the encoding.
    pub fn from_bytes(bytes: Vec<u8>, last_modified: SystemTime, sniff_limit: usize) -> Self {
        let kind = sniff(&bytes, sniff_limit);
        match kind {
            FileKind::Ascii | FileKind::Utf8 | FileKind::Utf8Bom => FileContents::Ascii(AsciiContents {
                offset: kind.bom_len(),
                buffer: bytes,
                last_modified,
                line_starts: OnceLock::new(),
            }),
            FileKind::Utf16Le | FileKind::Utf16Be => {
                let body = &bytes[kind.bom_len()..];
                let units = body
                    .chunks_exact(2)
                    .map(|pair| {
                        let pair = [pair[0], pair[1]];
                        if kind == FileKind::Utf16Le {
                            u16::from_le_bytes(pair)
                        } else {
                            u16::from_be_bytes(pair)
                        }
                    })
                    .collect();
                FileContents::Utf16(Utf16Contents {
                    units,
                    file_size: bytes.len() as u64,
                    last_modified,
                    line_starts: OnceLock::new(),
                })
            }
            FileKind::Binary => Self::binary(bytes.len() as u64, last_modified),
        }
    }

    pub fn binary(file_size: u64, last_modified: SystemTime) -> Self {
        FileContents::Binary(BinaryContents {
            file_size,
            last_modified,
        })
    }

    pub fn last_modified(&self) -> SystemTime {
        match self {
            FileContents::Ascii(c) => c.last_modified,
            FileContents::Utf16(c) => c.last_modified,
            FileContents::Binary(c) => c.last_modified,
        }
    }

    pub fn is_searchable(&self) -> bool {
        !matches!(self, FileContents::Binary(_))
    }

    pub fn character_width(&self) -> CharacterWidth {
        match self {
            FileContents::Utf16(_) => CharacterWidth::Two,
            _ => CharacterWidth::One,
        }
    }

    /// Number of character units held in memory.
    pub fn char_length(&self) -> usize {
        match self {
            FileContents::Ascii(c) => c.text().len(),
            FileContents::Utf16(c) => c.units.len(),
            FileContents::Binary(_) => 0,
        }
    }

    /// Bytes held in memory for searching.
    pub fn byte_length(&self) -> usize {
        self.char_length() * self.character_width().bytes()
    }

    /// Size of the file on disk.
    pub fn file_size(&self) -> u64 {
        match self {
            FileContents::Ascii(c) => c.buffer.len() as u64,
            FileContents::Utf16(c) => c.file_size,
            FileContents::Binary(c) => c.file_size,
        }
    }

    /// Offsets of the first character of every line. Built on first use.
    pub fn line_starts(&self) -> &[usize] {
        match self {
            FileContents::Ascii(c) => c.line_starts.get_or_init(|| {
                std::iter::once(0)
                    .chain(memchr_iter(b'\n', c.text()).map(|i| i + 1))
                    .collect()
            }),
            FileContents::Utf16(c) => c.line_starts.get_or_init(|| {
                std::iter::once(0)
                    .chain(
                        c.units
                            .iter()
                            .enumerate()
                            .filter(|(_, u)| **u == u16::from(b'\n'))
                            .map(|(i, _)| i + 1),
                    )
                    .collect()
            }),
            FileContents::Binary(_) => &[],
        }
    }

    /// Zero-based (line, column) of character `offset`.
    pub fn position_of(&self, offset: usize) -> (usize, usize) {
        let starts = self.line_starts();
        if starts.is_empty() {
            return (0, offset);
        }
        let line = match starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line, offset - starts[line])
    }

    /// Character range of `line` without its line terminator.
    pub fn line_range(&self, line: usize) -> Option<Range<usize>> {
        let starts = self.line_starts();
        let start = *starts.get(line)?;
        let mut end = starts.get(line + 1).map_or(self.char_length(), |next| next - 1);
        if end > start && self.char_at(end - 1) == Some(u16::from(b'\r')) {
            end -= 1;
        }
        Some(start..end)
    }

    /// False when `offset` falls inside a multi-unit character.
    pub fn is_char_boundary(&self, offset: usize) -> bool {
        match self {
            FileContents::Ascii(c) => c.text().get(offset).map_or(true, |b| b & 0xC0 != 0x80),
            FileContents::Utf16(c) => c
                .units
                .get(offset)
                .map_or(true, |u| !(0xDC00..0xE000).contains(u)),
            FileContents::Binary(_) => true,
        }
    }

    fn char_at(&self, offset: usize) -> Option<u16> {
        match self {
            FileContents::Ascii(c) => c.text().get(offset).map(|b| u16::from(*b)),
            FileContents::Utf16(c) => c.units.get(offset).copied(),
            FileContents::Binary(_) => None,
        }
    }

    /// Text of a character range, lossily decoded.
    pub fn text_slice(&self, range: Range<usize>) -> Cow<'_, str> {
        let len = self.char_length();
        let range = range.start.min(len)..range.end.min(len);
        match self {
            FileContents::Ascii(c) => String::from_utf8_lossy(&c.text()[range]),
            FileContents::Utf16(c) => Cow::Owned(String::from_utf16_lossy(&c.units[range])),
            FileContents::Binary(_) => Cow::Borrowed(""),
        }
    }

    /// Same variant with byte-identical memory.
    pub fn contents_equal(&self, other: &FileContents) -> bool {
        match (self, other) {
            (FileContents::Ascii(a), FileContents::Ascii(b)) => a.buffer == b.buffer,
            (FileContents::Utf16(a), FileContents::Utf16(b)) => a.units == b.units,
            (FileContents::Binary(a), FileContents::Binary(b)) => a.file_size == b.file_size,
            _ => false,
        }
    }

    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        match self {
            FileContents::Ascii(c) => {
                hasher.write_u8(0);
                hasher.write(&c.buffer);
            }
            FileContents::Utf16(c) => {
                hasher.write_u8(1);
                for unit in &c.units {
                    hasher.write_u16(*unit);
                }
            }
            FileContents::Binary(c) => {
                hasher.write_u8(2);
                hasher.write_u64(c.file_size);
            }
        }
        hasher.finish()
    }
}

impl fmt::Debug for FileContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            FileContents::Ascii(_) => "Ascii",
            FileContents::Utf16(_) => "Utf16",
            FileContents::Binary(_) => "Binary",
        };
        f.debug_struct(variant)
            .field("char_length", &self.char_length())
            .field("file_size", &self.file_size())
            .finish()
    }
}
