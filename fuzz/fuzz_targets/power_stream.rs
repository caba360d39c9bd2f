#![no_main]

use libfuzzer_sys::fuzz_target;
use vatio::power::parse_stream;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_stream(input);
    }
});
