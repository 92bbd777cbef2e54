#![no_main]

use libfuzzer_sys::fuzz_target;

use wasmdec::parser;

fuzz_target!(|data: &[u8]| {
    // Only panics and out-of-bounds reads matter; errors are expected.
    if let Err(error) = parser::decode(data) {
        assert!(error.offset <= data.len());
    }
});
