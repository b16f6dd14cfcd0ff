#![no_main]

use std::io::{BufReader, Cursor};

use arbitrary::Arbitrary;
use catsweep_sweeper::driver::{BoundedLineReader, StreamUnit, UnitSplitter};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    content: Vec<u8>,
    terminator: Vec<u8>,
    buffer_size: u8,
}

// Streaming reads must yield the same units as splitting the whole buffer.
fuzz_target!(|input: Input| {
    if input.terminator.is_empty() || input.terminator.len() > 4 {
        return;
    }

    let expected: Vec<Vec<u8>> = UnitSplitter::new(&input.content, &input.terminator)
        .map(<[u8]>::to_vec)
        .collect();

    let capacity = usize::from(input.buffer_size).max(1);
    let reader = BufReader::with_capacity(capacity, Cursor::new(&input.content));
    let mut stream = BoundedLineReader::new(reader, input.terminator.clone(), None);

    let mut actual = Vec::new();
    while let Some(unit) = stream.next_unit().unwrap() {
        match unit {
            StreamUnit::Unit(bytes) => actual.push(bytes.to_vec()),
            StreamUnit::TooLong { .. } => unreachable!("no limit configured"),
        }
    }

    assert_eq!(expected, actual);
});
