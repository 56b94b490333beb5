#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_front::{Options, Reader, Scanner, TokenData};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let mut reader = Reader::new();
    reader.set_input_string(&mut data);
    let mut scanner = Scanner::new(reader, &Options::default());
    while let Ok(token) = scanner.next_token() {
        if matches!(token.data, TokenData::StreamEnd) {
            break;
        }
    }
}
