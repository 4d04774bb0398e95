//! Backward Nondeterministic DAWG Matching over one machine word.
//!
//! Used for literal patterns of at most 64 bytes.

pub const MAX_PATTERN_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct Bndm {
    masks: Box<[u64; 256]>,
    len: usize,
    high_bit: u64,
    word_mask: u64,
}

impl Bndm {
    /// `None` if the pattern is empty or longer than 64 bytes.
    pub fn new(pattern: &[u8], match_case: bool) -> Option<Self> {
        let len = pattern.len();
        if len == 0 || len > MAX_PATTERN_LEN {
            return None;
        }
        let mut masks = Box::new([0u64; 256]);
        for (i, &byte) in pattern.iter().enumerate() {
            let bit = 1u64 << (len - 1 - i);
            if match_case {
                masks[byte as usize] |= bit;
            } else {
                masks[byte.to_ascii_lowercase() as usize] |= bit;
                masks[byte.to_ascii_uppercase() as usize] |= bit;
            }
        }
        let word_mask = if len == 64 { u64::MAX } else { (1u64 << len) - 1 };
        Some(Self {
            masks,
            len,
            high_bit: 1u64 << (len - 1),
            word_mask,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Start offsets of every occurrence, overlapping ones included, in
    /// ascending order.
    pub fn find_all(&self, text: &[u8], mut report: impl FnMut(usize)) {
        let m = self.len;
        if text.len() < m {
            return;
        }
        let mut pos = 0;
        while pos <= text.len() - m {
            let mut j = m;
            let mut last = m;
            let mut d = self.word_mask;
            while d != 0 && j > 0 {
                d &= self.masks[text[pos + j - 1] as usize];
                j -= 1;
                if d & self.high_bit != 0 {
                    if j > 0 {
                        last = j;
                    } else {
                        report(pos);
                        break;
                    }
                }
                d = (d << 1) & self.word_mask;
            }
            pos += last;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::naive_find_all;

    fn collect(pattern: &[u8], text: &[u8], match_case: bool) -> Vec<usize> {
        let mut out = Vec::new();
        Bndm::new(pattern, match_case)
            .unwrap()
            .find_all(text, |p| out.push(p));
        out
    }

    #[test]
    fn finds_overlapping_matches() {
        assert_eq!(collect(b"aa", b"aaaa", true), vec![0, 1, 2]);
        assert_eq!(collect(b"foo", b"foo bar foo", true), vec![0, 8]);
    }

    #[test]
    fn ascii_case_folding() {
        assert_eq!(collect(b"Foo", b"foo FOO fOo", false), vec![0, 4, 8]);
        assert_eq!(collect(b"Foo", b"foo FOO fOo", true), Vec::<usize>::new());
    }

    #[test]
    fn sixty_four_byte_pattern() {
        let pattern = [b'x'; 64];
        let mut text = vec![b'y'; 10];
        text.extend_from_slice(&pattern);
        assert_eq!(collect(&pattern, &text, true), vec![10]);
    }

    #[test]
    fn rejects_long_or_empty_patterns() {
        assert!(Bndm::new(b"", true).is_none());
        assert!(Bndm::new(&[b'a'; 65], true).is_none());
    }

    #[test]
    fn agrees_with_naive_search() {
        let mut seed = 0x2545_f491_u32;
        let mut next = || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 16) as u8 % 3 + b'a'
        };
        for _ in 0..200 {
            let text: Vec<u8> = (0..120).map(|_| next()).collect();
            let len = (next() - b'a') as usize + 1;
            let pattern: Vec<u8> = (0..len).map(|_| next()).collect();
            assert_eq!(
                collect(&pattern, &text, true),
                naive_find_all(&pattern, &text, true),
                "pattern {pattern:?}"
            );
        }
    }
}
