//! Compiled text search over in-memory contents.
//!
//! A pattern is compiled once per query and character width, then run
//! against every [`FileContentsPiece`](crate::contents::FileContentsPiece)
//! of the database in parallel.

pub mod bndm;
pub mod compiled;
pub mod horspool;
pub mod regex_search;
pub mod utf16;

pub use compiled::{CompiledTextSearch, compile_search};

use crate::cancel::CancellationToken;
use crate::contents::CharacterWidth;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexEngine {
    /// Linear-time automaton.
    #[default]
    Automaton,
    /// Bounded backtracking; falls back to the automaton on large inputs.
    Backtracking,
}

impl std::str::FromStr for RegexEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "automaton" => Ok(RegexEngine::Automaton),
            "backtracking" => Ok(RegexEngine::Backtracking),
            other => Err(format!("unknown regex engine: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    pub match_case: bool,
    pub match_whole_word: bool,
    pub use_regex: bool,
    pub regex_engine: RegexEngine,
    pub character_width: CharacterWidth,
}

/// A match, in character units from the start of the file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilePositionSpan {
    pub position: usize,
    pub length: usize,
}

impl FilePositionSpan {
    pub fn new(position: usize, length: usize) -> Self {
        Self { position, length }
    }

    pub fn end(&self) -> usize {
        self.position + self.length
    }
}

/// Shared state of one search across all pieces.
#[derive(Debug, Default)]
pub struct SearchProgress {
    pub token: CancellationToken,
    /// Matches found so far, including those beyond any result cap.
    pub matches: AtomicUsize,
    /// Pieces scanned so far.
    pub pieces: AtomicUsize,
}

impl SearchProgress {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }
}

#[inline]
pub(crate) fn fold(byte: u8) -> u8 {
    byte.to_ascii_lowercase()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::fold;

    /// Reference implementation the fast matchers are checked against.
    pub fn naive_find_all(pattern: &[u8], text: &[u8], match_case: bool) -> Vec<usize> {
        if pattern.is_empty() || text.len() < pattern.len() {
            return Vec::new();
        }
        (0..=text.len() - pattern.len())
            .filter(|&i| {
                text[i..i + pattern.len()]
                    .iter()
                    .zip(pattern)
                    .all(|(&t, &p)| if match_case { t == p } else { fold(t) == fold(p) })
            })
            .collect()
    }

    #[test]
    fn naive_reference() {
        assert_eq!(naive_find_all(b"ab", b"abab", true), vec![0, 2]);
        assert_eq!(naive_find_all(b"AB", b"abab", false), vec![0, 2]);
    }
}
