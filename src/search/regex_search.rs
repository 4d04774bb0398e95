//! Regular expression search over byte contents.

use super::RegexEngine;
use crate::error::{Error, Result};
use regex::bytes::{Regex, RegexBuilder};
use std::ops::Range;
use regex_automata::Input;
use regex_automata::nfa::thompson::backtrack::BoundedBacktracker;
use regex_automata::util::syntax;

#[derive(Debug, Clone)]
pub struct RegexSearch {
    automaton: Regex,
    backtracker: Option<BoundedBacktracker>,
}

impl RegexSearch {
    pub fn new(
        pattern: &str,
        match_case: bool,
        whole_word: bool,
        engine: RegexEngine,
    ) -> Result<Self> {
        let pattern = if whole_word {
            format!(r"\b(?:{pattern})\b")
        } else {
            pattern.to_string()
        };
        let automaton = RegexBuilder::new(&pattern)
            .case_insensitive(!match_case)
            .multi_line(true)
            .build()?;
        let backtracker = match engine {
            RegexEngine::Automaton => None,
            RegexEngine::Backtracking => Some(
                BoundedBacktracker::builder()
                    .syntax(
                        syntax::Config::new()
                            .case_insensitive(!match_case)
                            .multi_line(true),
                    )
                    .build(&pattern)
                    .map_err(|e| Error::InvalidPattern(e.to_string()))?,
            ),
        };
        Ok(Self {
            automaton,
            backtracker,
        })
    }

    /// Non-empty, non-overlapping matches inside `range`, as absolute
    /// (start, end) byte offsets into `text`.
    ///
    /// Anchors and word boundaries see the bytes around `range`. Matches
    /// that run past the end of `range` are not reported.
    pub fn find_all(
        &self,
        text: &[u8],
        range: Range<usize>,
        mut report: impl FnMut(usize, usize),
    ) {
        // One UTF-8 character past the range is enough for `$` and `\b`.
        let context_end = (range.end + 4).min(text.len());
        let haystack = &text[..context_end];

        if let Some(backtracker) = &self.backtracker {
            let mut cache = backtracker.create_cache();
            let input = Input::new(haystack).range(range.start..context_end);
            let mut found = Vec::new();
            let mut too_long = false;
            for m in backtracker.try_find_iter(&mut cache, input) {
                match m {
                    Ok(m) if m.end() > range.end => break,
                    Ok(m) if !m.is_empty() => found.push((m.start(), m.end())),
                    Ok(_) => {}
                    Err(_) => {
                        // Past its limit the backtracker's visited set gets
                        // too large; the automaton takes over.
                        too_long = true;
                        break;
                    }
                }
            }
            if !too_long {
                for (start, end) in found {
                    report(start, end);
                }
                return;
            }
        }

        let mut pos = range.start;
        while pos < range.end {
            let Some(m) = self.automaton.find_at(haystack, pos) else {
                break;
            };
            if m.end() > range.end {
                break;
            }
            if m.is_empty() {
                pos = m.end() + 1;
                continue;
            }
            report(m.start(), m.end());
            pos = m.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(pattern: &str, text: &str, engine: RegexEngine) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        RegexSearch::new(pattern, false, false, engine)
            .unwrap()
            .find_all(text.as_bytes(), 0..text.len(), |s, e| out.push((s, e)));
        out
    }

    #[test]
    fn engines_agree() {
        let text = "fn alpha() {}\nfn beta() {}\n";
        let auto = collect(r"fn \w+", text, RegexEngine::Automaton);
        let back = collect(r"fn \w+", text, RegexEngine::Backtracking);
        assert_eq!(auto, vec![(0, 8), (14, 21)]);
        assert_eq!(auto, back);
    }

    #[test]
    fn empty_matches_are_skipped() {
        assert_eq!(collect("x*", "abxxc", RegexEngine::Automaton), vec![(2, 4)]);
    }

    #[test]
    fn multi_line_anchors() {
        assert_eq!(collect("^b", "a\nb\n", RegexEngine::Automaton), vec![(2, 3)]);
    }

    #[test]
    fn invalid_pattern() {
        let result = RegexSearch::new("(", true, false, RegexEngine::Automaton);
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn whole_word_wrapping() {
        let mut out = Vec::new();
        RegexSearch::new("foo", true, true, RegexEngine::Automaton)
            .unwrap()
            .find_all(b"foo food foo", 0..12, |s, e| out.push((s, e)));
        assert_eq!(out, vec![(0, 3), (9, 12)]);
    }

    fn collect_in(pattern: &str, whole_word: bool, text: &str, range: Range<usize>, engine: RegexEngine) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        RegexSearch::new(pattern, true, whole_word, engine)
            .unwrap()
            .find_all(text.as_bytes(), range, |s, e| out.push((s, e)));
        out
    }

    #[test]
    fn range_start_is_not_a_line_start() {
        for engine in [RegexEngine::Automaton, RegexEngine::Backtracking] {
            assert!(collect_in("^fo", false, "xxfoo\n", 2..4, engine).is_empty());
            assert!(collect_in("fo", true, "xxfoo\n", 2..4, engine).is_empty());
            assert_eq!(collect_in("^fo", false, "x\nfoo\n", 2..4, engine), vec![(2, 4)]);
        }
    }

    #[test]
    fn range_end_is_not_a_line_end() {
        for engine in [RegexEngine::Automaton, RegexEngine::Backtracking] {
            assert!(collect_in("fo$", false, "foo\n", 0..2, engine).is_empty());
            assert!(collect_in("fo", true, "foo\n", 0..2, engine).is_empty());
            assert_eq!(collect_in("fo$", false, "fo\nfo\n", 0..3, engine), vec![(0, 2)]);
        }
    }

    #[test]
    fn matches_crossing_range_end_are_dropped() {
        for engine in [RegexEngine::Automaton, RegexEngine::Backtracking] {
            assert!(collect_in("foo", false, "xfoo", 0..3, engine).is_empty());
        }
    }
}
