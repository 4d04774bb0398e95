#![no_main]

use arbitrary::Arbitrary;
use codesnap::search::bndm::Bndm;
use codesnap::search::horspool::Horspool;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    pattern: &'a [u8],
    text: &'a [u8],
    match_case: bool,
}

fn fold(b: u8) -> u8 {
    b.to_ascii_lowercase()
}

fn naive(pattern: &[u8], text: &[u8], match_case: bool) -> Vec<usize> {
    if pattern.is_empty() || pattern.len() > text.len() {
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

fuzz_target!(|input: Input| {
    // Both literal matchers must agree with a plain scan.
    let expected = naive(input.pattern, input.text, input.match_case);

    if let Some(bndm) = Bndm::new(input.pattern, input.match_case) {
        let mut found = Vec::new();
        bndm.find_all(input.text, |pos| found.push(pos));
        found.sort_unstable();
        assert_eq!(found, expected);
    }
    if let Some(horspool) = Horspool::new(input.pattern, input.match_case) {
        let mut found = Vec::new();
        horspool.find_all(input.text, |pos| found.push(pos));
        found.sort_unstable();
        assert_eq!(found, expected);
    }
});
