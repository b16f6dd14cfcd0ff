#![no_main]

use catsweep_sweeper::parser::{TsvDecoder, UnitDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoder = TsvDecoder::new(vec![
        "hdfs_path".to_owned(),
        "unixtimestamp".to_owned(),
        "label".to_owned(),
        "message".to_owned(),
    ]);
    if let Ok(record) = decoder.decode(data) {
        assert_eq!(record.len(), 4);
        assert!(record.contains_key("message"));
    }
});
