#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/yaml-front/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::too_many_arguments,
    clippy::too_many_lines
)]
#![deny(unsafe_code)]

extern crate alloc;

mod macros;

mod error;
mod event;
mod mark;
mod parser;
mod reader;
mod scanner;
mod token;

pub use crate::error::*;
pub use crate::event::*;
pub use crate::mark::Mark;
pub use crate::parser::Parser;
pub use crate::reader::Reader;
pub use crate::scanner::Scanner;
pub use crate::token::*;

/// The stream encoding, detected by the [`Reader`] from a byte-order mark.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Not yet determined; the reader sniffs a BOM (or falls back to UTF-8)
    /// on first use.
    #[default]
    Any = 0,
    /// UTF-8, with or without a BOM.
    Utf8 = 1,
    /// UTF-16, little-endian, with BOM.
    Utf16Le = 2,
    /// UTF-16, big-endian, with BOM.
    Utf16Be = 3,
}

/// Scalar styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// No explicit style; only ever produced by synthesized empty scalars.
    #[default]
    Any = 0,
    /// Unquoted scalar, e.g. `foo`.
    Plain = 1,
    /// `'...'`, with `''` as the only escape.
    SingleQuoted = 2,
    /// `"..."`, with C-style escapes.
    DoubleQuoted = 3,
    /// `|` block scalar.
    Literal = 4,
    /// `>` block scalar.
    Folded = 5,
}

/// Sequence styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// `- a\n- b`
    Block = 1,
    /// `[a, b]`
    Flow = 2,
}

/// Mapping styles.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// `a: b`
    Block = 1,
    /// `{a: b}`
    Flow = 2,
}

/// Where a [`Comment`](token::TokenData::Comment) sits relative to the
/// tokens/events around it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum CommentKind {
    /// The comment is the only thing on its line.
    Block,
    /// The comment trails content already on the same line.
    InLine,
    /// A line with nothing on it at all, not even a `#`.
    BlankLine,
}

/// The `%YAML` directive payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct VersionDirective {
    /// The major version number.
    pub major: i32,
    /// The minor version number.
    pub minor: i32,
}

/// A single `%TAG` directive, or one of the two always-installed defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle, e.g. `!`, `!!`, or `!foo!`.
    pub handle: String,
    /// The prefix it expands to.
    pub prefix: String,
}

/// The default primary tag handle, always installed.
pub const DEFAULT_PRIMARY_TAG_HANDLE: &str = "!";
/// The default secondary tag handle, always installed.
pub const DEFAULT_SECONDARY_TAG_HANDLE: &str = "!!";
/// What the default secondary tag handle (`!!`) expands to.
pub const DEFAULT_SECONDARY_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Configuration surface consumed by the scanner/parser, plus fields that
/// exist only to be forwarded to the composer collaborator.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Options {
    /// When set, the scanner emits [`Comment`](token::TokenData::Comment)
    /// tokens (and the parser mirrors them as
    /// [`Comment`](event::EventData::Comment) events) instead of discarding
    /// `#`-comments and blank lines. Consumed by the scanner and parser.
    pub parse_comments: bool,
    /// Forwarded to the composer collaborator; the core never checks for
    /// duplicate mapping keys itself.
    pub allow_duplicate_keys: bool,
    /// Forwarded to the composer collaborator.
    pub max_aliases_for_collections: u32,
    /// Forwarded to the composer collaborator.
    pub allow_recursive_keys: bool,
    /// Maximum depth of nested block/flow collections before the parser
    /// raises [`ParserError::Problem`]. Consumed by the parser.
    pub nesting_depth_limit: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            parse_comments: false,
            allow_duplicate_keys: true,
            max_aliases_for_collections: 50,
            allow_recursive_keys: false,
            nesting_depth_limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn events(input: &str) -> Vec<EventData> {
        let mut reader = Reader::new();
        let mut bytes = input.as_bytes();
        reader.set_input_string(&mut bytes);
        let mut parser = Parser::new(reader, Options::default());
        let mut out = Vec::new();
        while let Some(event) = parser.next_event().unwrap() {
            out.push(event.data);
        }
        out
    }

    #[test]
    fn scenario_key_value_mapping() {
        let evs = events("key: value\n");
        assert!(matches!(evs[0], EventData::StreamStart { .. }));
        assert!(matches!(evs[1], EventData::DocumentStart { implicit: true, .. }));
        assert!(matches!(
            evs[2],
            EventData::MappingStart {
                style: MappingStyle::Block,
                ..
            }
        ));
        assert!(matches!(&evs[3], EventData::Scalar { value, .. } if value == "key"));
        assert!(matches!(&evs[4], EventData::Scalar { value, .. } if value == "value"));
        assert!(matches!(evs[5], EventData::MappingEnd));
        assert!(matches!(evs[6], EventData::DocumentEnd { implicit: true }));
        assert!(matches!(evs[7], EventData::StreamEnd));
    }

    #[test]
    fn scenario_flow_sequence() {
        let evs = events("[1, 2, 3]\n");
        assert!(matches!(
            evs[2],
            EventData::SequenceStart {
                style: SequenceStyle::Flow,
                ..
            }
        ));
        assert!(matches!(&evs[3], EventData::Scalar { value, .. } if value == "1"));
        assert!(matches!(&evs[4], EventData::Scalar { value, .. } if value == "2"));
        assert!(matches!(&evs[5], EventData::Scalar { value, .. } if value == "3"));
        assert!(matches!(evs[6], EventData::SequenceEnd));
    }

    #[test]
    fn scenario_explicit_document_with_version_directive() {
        let evs = events("%YAML 1.1\n---\nfoo\n...\n");
        match &evs[1] {
            EventData::DocumentStart {
                implicit,
                version_directive,
                ..
            } => {
                assert!(!implicit);
                assert_eq!(version_directive.map(|v| (v.major, v.minor)), Some((1, 1)));
            }
            other => panic!("expected document start, got {other:?}"),
        }
        assert!(matches!(&evs[2], EventData::Scalar { value, .. } if value == "foo"));
        assert!(matches!(evs[3], EventData::DocumentEnd { implicit: false }));
    }

    #[test]
    fn scenario_empty_stream() {
        let evs = events("");
        assert!(matches!(evs[0], EventData::StreamStart { .. }));
        assert!(matches!(evs[1], EventData::StreamEnd));
    }

    #[test]
    fn scenario_implicit_document_with_no_content_is_an_empty_scalar() {
        let evs = events("---\n");
        let scalar = evs
            .iter()
            .find(|e| matches!(e, EventData::Scalar { .. }))
            .expect("expected a synthesized empty scalar");
        assert!(matches!(scalar, EventData::Scalar { value, style, .. }
            if value.is_empty() && *style == ScalarStyle::Plain));
    }

    #[test]
    fn rejects_non_printable_code_point() {
        let mut reader = Reader::new();
        let mut bytes: &[u8] = b"\x01";
        reader.set_input_string(&mut bytes);
        let mut parser = Parser::new(reader, Options::default());
        let err = parser.next_event().unwrap_err();
        assert!(matches!(err, ParserError::Scanner(ScannerError::Reader(
            ReaderError::NotPrintable { .. }
        ))));
    }
}
