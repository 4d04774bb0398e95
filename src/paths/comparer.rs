//! Platform path ordering.
//!
//! Separators sort before every other character so that `a/b` orders before
//! `a.b` and `a-b`, which keeps a directory's contents adjacent to it when a
//! flat list of paths is sorted. Letters compare case-folded first; the
//! case-sensitive comparer then breaks ties by code point so the order stays
//! total and agrees with equality.

use std::cmp::Ordering;
use std::hash::Hasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathComparer {
    CaseInsensitive,
    #[default]
    CaseSensitive,
}

#[inline]
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[inline]
fn normalize(c: char) -> char {
    if is_separator(c) { '\0' } else { c }
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(|c| {
        let c = normalize(c);
        c.to_lowercase()
    })
}

fn ordinal(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().map(normalize)
}

impl PathComparer {
    /// The comparer matching the host file system's case rules.
    pub const fn platform() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            PathComparer::CaseInsensitive
        } else {
            PathComparer::CaseSensitive
        }
    }

    pub fn compare(self, a: &str, b: &str) -> Ordering {
        let primary = folded(a).cmp(folded(b));
        match (primary, self) {
            (Ordering::Equal, PathComparer::CaseSensitive) => ordinal(a).cmp(ordinal(b)),
            _ => primary,
        }
    }

    pub fn equals(self, a: &str, b: &str) -> bool {
        match self {
            PathComparer::CaseInsensitive => folded(a).eq(folded(b)),
            PathComparer::CaseSensitive => ordinal(a).eq(ordinal(b)),
        }
    }

    /// Feed `s` into `state` consistently with [`PathComparer::equals`].
    pub fn hash<H: Hasher>(self, s: &str, state: &mut H) {
        match self {
            PathComparer::CaseInsensitive => folded(s).for_each(|c| state.write_u32(c as u32)),
            PathComparer::CaseSensitive => ordinal(s).for_each(|c| state.write_u32(c as u32)),
        }
        state.write_u8(0xff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHasher;

    fn hash_of(comparer: PathComparer, s: &str) -> u64 {
        let mut hasher = FxHasher::default();
        comparer.hash(s, &mut hasher);
        hasher.finish()
    }

    #[test]
    fn separators_sort_first() {
        let c = PathComparer::CaseSensitive;
        assert_eq!(c.compare("a/b", "a.b"), Ordering::Less);
        assert_eq!(c.compare("a\\b", "a-b"), Ordering::Less);
        assert!(c.equals("a/b", "a\\b"));
    }

    #[test]
    fn case_insensitive_equality() {
        let c = PathComparer::CaseInsensitive;
        assert!(c.equals("Foo.TXT", "foo.txt"));
        assert_eq!(c.compare("Foo", "foo"), Ordering::Equal);
        assert_eq!(hash_of(c, "Foo.TXT"), hash_of(c, "foo.txt"));
    }

    #[test]
    fn case_sensitive_breaks_ties_by_code_point() {
        let c = PathComparer::CaseSensitive;
        assert!(!c.equals("Foo", "foo"));
        assert_eq!(c.compare("Foo", "foo"), Ordering::Less);
        // Case folding still drives the primary order.
        assert_eq!(c.compare("apple", "Banana"), Ordering::Less);
    }
}
