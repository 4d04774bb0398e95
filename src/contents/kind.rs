use memchr::memchr;
use serde::Serialize;

/// Encoding guessed from the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    /// Only 7-bit bytes in the examined prefix.
    Ascii,
    /// Valid UTF-8 without a byte order mark.
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// NUL bytes or invalid UTF-8 in the examined prefix.
    Binary,
}

impl FileKind {
    /// Length of the byte order mark to skip.
    pub fn bom_len(self) -> usize {
        match self {
            FileKind::Utf8Bom => 3,
            FileKind::Utf16Le | FileKind::Utf16Be => 2,
            _ => 0,
        }
    }

    pub fn is_text(self) -> bool {
        self != FileKind::Binary
    }
}

/// Guess the kind of `bytes`, examining at most `limit` bytes after any
/// byte order mark.
pub fn sniff(bytes: &[u8], limit: usize) -> FileKind {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return FileKind::Utf8Bom;
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return FileKind::Utf16Le;
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return FileKind::Utf16Be;
    }

    let prefix = &bytes[..bytes.len().min(limit)];
    if memchr(0, prefix).is_some() {
        return FileKind::Binary;
    }
    if prefix.is_ascii() {
        return FileKind::Ascii;
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => FileKind::Utf8,
        // A multi-byte sequence cut by the prefix boundary is fine.
        Err(e) if e.error_len().is_none() && prefix.len() < bytes.len() => FileKind::Utf8,
        Err(_) => FileKind::Binary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_boms() {
        assert_eq!(sniff(b"\xEF\xBB\xBFhello", 8192), FileKind::Utf8Bom);
        assert_eq!(sniff(b"\xFF\xFEh\0i\0", 8192), FileKind::Utf16Le);
        assert_eq!(sniff(b"\xFE\xFF\0h\0i", 8192), FileKind::Utf16Be);
    }

    #[test]
    fn ascii_and_utf8() {
        assert_eq!(sniff(b"plain text\n", 8192), FileKind::Ascii);
        assert_eq!(sniff("caf\u{e9}".as_bytes(), 8192), FileKind::Utf8);
        assert_eq!(sniff(b"", 8192), FileKind::Ascii);
    }

    #[test]
    fn nul_or_invalid_utf8_is_binary() {
        assert_eq!(sniff(b"ab\0cd", 8192), FileKind::Binary);
        assert_eq!(sniff(b"ab\xFFcd", 8192), FileKind::Binary);
    }

    #[test]
    fn only_prefix_is_examined() {
        let mut bytes = vec![b'a'; 16];
        bytes.push(0);
        assert_eq!(sniff(&bytes, 16), FileKind::Ascii);
        assert_eq!(sniff(&bytes, 17), FileKind::Binary);
    }

    #[test]
    fn truncated_sequence_at_prefix_end() {
        let text = "aaa\u{e9}".as_bytes();
        // The prefix ends inside the two-byte sequence.
        assert_eq!(sniff(text, 4), FileKind::Utf8);
    }
}
