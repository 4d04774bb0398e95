//! Literal search over UTF-16 code units.

#[inline]
fn fold_unit(unit: u16) -> u16 {
    if unit < 0x80 {
        u16::from((unit as u8).to_ascii_lowercase())
    } else {
        unit
    }
}

#[derive(Debug, Clone)]
pub struct Utf16Search {
    pattern: Vec<u16>,
    match_case: bool,
}

impl Utf16Search {
    pub fn new(pattern: &str, match_case: bool) -> Option<Self> {
        let pattern: Vec<u16> = if match_case {
            pattern.encode_utf16().collect()
        } else {
            pattern.encode_utf16().map(fold_unit).collect()
        };
        if pattern.is_empty() {
            return None;
        }
        Some(Self {
            pattern,
            match_case,
        })
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn find_all(&self, text: &[u16], mut report: impl FnMut(usize)) {
        let m = self.pattern.len();
        if text.len() < m {
            return;
        }
        let first = self.pattern[0];
        for pos in 0..=text.len() - m {
            let key = |u: u16| if self.match_case { u } else { fold_unit(u) };
            if key(text[pos]) != first {
                continue;
            }
            if text[pos + 1..pos + m]
                .iter()
                .zip(&self.pattern[1..])
                .all(|(&t, &p)| key(t) == p)
            {
                report(pos);
            }
        }
    }
}
