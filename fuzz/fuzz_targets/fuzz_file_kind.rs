#![no_main]

use codesnap::contents::{FileContents, sniff};
use libfuzzer_sys::fuzz_target;
use std::time::SystemTime;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must classify and index without panicking.
    let _ = sniff(data, 8192);
    let contents = FileContents::from_bytes(data.to_vec(), SystemTime::UNIX_EPOCH, 8192);
    let len = contents.char_length();
    if contents.is_searchable() {
        let lines = contents.line_starts().len();
        for line in 0..lines {
            if let Some(range) = contents.line_range(line) {
                let _ = contents.text_slice(range);
            }
        }
        let _ = contents.position_of(len);
    }
});
