#![no_main]

use dayfeed::find_matching_delimiter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let bytes = s.as_bytes();
        for start in 0..bytes.len() {
            if let Some(end) = find_matching_delimiter(s, start) {
                assert!(end > start);
                assert!(matches!(bytes[end], b'}' | b']'));
                // The match depends only on bytes up to the closer.
                assert_eq!(find_matching_delimiter(&s[..=end], start), Some(end));
            }
        }
    }
});
