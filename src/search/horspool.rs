//! Boyer–Moore–Horspool for literal patterns longer than a machine word.

use super::fold;

#[derive(Debug, Clone)]
pub struct Horspool {
    pattern: Vec<u8>,
    shifts: Box<[usize; 256]>,
    match_case: bool,
}

impl Horspool {
    pub fn new(pattern: &[u8], match_case: bool) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        let pattern: Vec<u8> = if match_case {
            pattern.to_vec()
        } else {
            pattern.iter().map(|&b| fold(b)).collect()
        };
        let m = pattern.len();
        let mut shifts = Box::new([m; 256]);
        for (i, &byte) in pattern[..m - 1].iter().enumerate() {
            shifts[byte as usize] = m - 1 - i;
        }
        Some(Self {
            pattern,
            shifts,
            match_case,
        })
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    #[inline]
    fn key(&self, byte: u8) -> u8 {
        if self.match_case { byte } else { fold(byte) }
    }

    /// Start offsets of every occurrence, overlapping ones included, in
    /// ascending order.
    pub fn find_all(&self, text: &[u8], mut report: impl FnMut(usize)) {
        let m = self.pattern.len();
        if text.len() < m {
            return;
        }
        let last = self.pattern[m - 1];
        let mut pos = 0;
        while pos <= text.len() - m {
            let tail = self.key(text[pos + m - 1]);
            if tail == last
                && text[pos..pos + m - 1]
                    .iter()
                    .zip(&self.pattern[..m - 1])
                    .all(|(&t, &p)| self.key(t) == p)
            {
                report(pos);
            }
            pos += self.shifts[tail as usize];
        }
    }
}
