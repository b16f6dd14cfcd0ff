#![no_main]

use catsweep_sweeper::parser::{JsonDecoder, UnitDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoder = JsonDecoder::new("message");
    if let Ok(record) = decoder.decode(data) {
        assert!(record.contains_key("message"));
    }
});
