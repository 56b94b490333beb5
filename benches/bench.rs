use criterion::{criterion_group, criterion_main, Criterion};
use yaml_front::{EventData, Options, Parser, Reader, Scanner, TokenData};

static SAMPLE_YAML: &[u8] = include_bytes!("sample.yml");

pub fn scan(c: &mut Criterion) {
    c.bench_function("scan representative document", |b| {
        b.iter(|| {
            let mut input = SAMPLE_YAML;
            let mut reader = Reader::new();
            reader.set_input_string(&mut input);
            let mut scanner = Scanner::new(reader, &Options::default());
            loop {
                let token = scanner.next_token().unwrap();
                if matches!(token.data, TokenData::StreamEnd) {
                    break;
                }
            }
        });
    });
}

pub fn parse(c: &mut Criterion) {
    c.bench_function("parse representative document", |b| {
        b.iter(|| {
            let mut input = SAMPLE_YAML;
            let mut reader = Reader::new();
            reader.set_input_string(&mut input);
            let mut parser = Parser::new(reader, Options::default());
            while let Some(event) = parser.next_event().unwrap() {
                if matches!(event.data, EventData::StreamEnd) {
                    break;
                }
            }
        });
    });
}

pub fn parse_with_comments(c: &mut Criterion) {
    c.bench_function("parse representative document with comments", |b| {
        b.iter(|| {
            let mut input = SAMPLE_YAML;
            let mut reader = Reader::new();
            reader.set_input_string(&mut input);
            let options = Options {
                parse_comments: true,
                ..Options::default()
            };
            let mut parser = Parser::new(reader, options);
            while let Some(event) = parser.next_event().unwrap() {
                if matches!(event.data, EventData::StreamEnd) {
                    break;
                }
            }
        });
    });
}

criterion_group!(benches, scan, parse, parse_with_comments);
criterion_main!(benches);
