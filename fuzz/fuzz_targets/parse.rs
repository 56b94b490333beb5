#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_front::{EventData, Options, Parser, Reader};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let mut reader = Reader::new();
    reader.set_input_string(&mut data);
    let mut parser = Parser::new(reader, Options::default());
    while let Ok(Some(event)) = parser.next_event() {
        if matches!(event.data, EventData::StreamEnd) {
            break;
        }
    }
}
