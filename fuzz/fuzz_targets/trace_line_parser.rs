#![no_main]

use libfuzzer_sys::fuzz_target;
use vatio::process_tree::{ProcessTree, TraceEvent};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither a single line nor a whole trace may panic
        for line in input.lines() {
            let _ = TraceEvent::parse(line);
        }
        let tree = ProcessTree::from_trace(input);
        let _ = tree.descendants(1);
    }
});
