use crate::{CommentKind, Encoding, Mark, ScalarStyle};

/// The token structure.
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct Token {
    /// The token data.
    pub data: TokenData,
    /// The beginning of the token.
    pub start_mark: Mark,
    /// The end of the token.
    pub end_mark: Mark,
}

#[derive(Debug, PartialEq)]
pub enum TokenData {
    /// A STREAM-START token.
    StreamStart {
        /// The stream encoding.
        encoding: Encoding,
    },
    /// A STREAM-END token.
    StreamEnd,
    /// A VERSION-DIRECTIVE token.
    VersionDirective {
        /// The major version number.
        major: i32,
        /// The minor version number.
        minor: i32,
    },
    /// A TAG-DIRECTIVE token.
    TagDirective {
        /// The tag handle.
        handle: String,
        /// The tag prefix.
        prefix: String,
    },
    /// A DOCUMENT-START token.
    DocumentStart,
    /// A DOCUMENT-END token.
    DocumentEnd,
    /// A BLOCK-SEQUENCE-START token.
    BlockSequenceStart,
    /// A BLOCK-MAPPING-START token.
    BlockMappingStart,
    /// A BLOCK-END token.
    BlockEnd,
    /// A FLOW-SEQUENCE-START token.
    FlowSequenceStart,
    /// A FLOW-SEQUENCE-END token.
    FlowSequenceEnd,
    /// A FLOW-MAPPING-START token.
    FlowMappingStart,
    /// A FLOW-MAPPING-END token.
    FlowMappingEnd,
    /// A BLOCK-ENTRY token.
    BlockEntry,
    /// A FLOW-ENTRY token.
    FlowEntry,
    /// A KEY token.
    Key,
    /// A VALUE token.
    Value,
    /// An ALIAS token.
    Alias {
        /// The alias value.
        value: String,
    },
    /// An ANCHOR token.
    Anchor {
        /// The anchor value.
        value: String,
    },
    /// A TAG token.
    Tag {
        /// The tag handle.
        handle: String,
        /// The tag suffix.
        suffix: String,
    },
    /// A SCALAR token.
    Scalar {
        /// The scalar value.
        value: String,
        /// The scalar style.
        style: ScalarStyle,
    },
    /// A COMMENT token, only produced when [`crate::Options::parse_comments`]
    /// is set.
    Comment {
        /// Where this comment sits relative to surrounding tokens.
        kind: CommentKind,
        /// The comment body, with the leading `#` and surrounding
        /// whitespace stripped.
        text: String,
    },
}

impl Token {
    pub(crate) fn new(data: TokenData, start_mark: Mark, end_mark: Mark) -> Self {
        Token {
            data,
            start_mark,
            end_mark,
        }
    }

    /// Make a token from its data, setting both marks to zero.
    fn from_data(data: TokenData) -> Self {
        Self::new(data, Mark::default(), Mark::default())
    }

    /// Create a STREAM-START token.
    pub fn stream_start(encoding: Encoding) -> Self {
        Self::from_data(TokenData::StreamStart { encoding })
    }

    /// Create a STREAM-END token.
    pub fn stream_end() -> Self {
        Self::from_data(TokenData::StreamEnd)
    }

    /// Create a VERSION-DIRECTIVE token.
    pub fn version_directive(major: i32, minor: i32) -> Self {
        Self::from_data(TokenData::VersionDirective { major, minor })
    }

    /// Create a TAG-DIRECTIVE token.
    pub fn tag_directive(handle: &str, prefix: &str) -> Self {
        Self::from_data(TokenData::TagDirective {
            handle: String::from(handle),
            prefix: String::from(prefix),
        })
    }

    /// Create a DOCUMENT-START token.
    pub fn document_start() -> Self {
        Self::from_data(TokenData::DocumentStart)
    }

    /// Create a DOCUMENT-END token.
    pub fn document_end() -> Self {
        Self::from_data(TokenData::DocumentEnd)
    }

    /// Create a BLOCK-SEQUENCE-START token.
    pub fn block_sequence_start() -> Self {
        Self::from_data(TokenData::BlockSequenceStart)
    }

    /// Create a BLOCK-MAPPING-START token.
    pub fn block_mapping_start() -> Self {
        Self::from_data(TokenData::BlockMappingStart)
    }

    /// Create a BLOCK-END token.
    pub fn block_end() -> Self {
        Self::from_data(TokenData::BlockEnd)
    }

    /// Create a FLOW-SEQUENCE-START token.
    pub fn flow_sequence_start() -> Self {
        Self::from_data(TokenData::FlowSequenceStart)
    }

    /// Create a FLOW-SEQUENCE-END token.
    pub fn flow_sequence_end() -> Self {
        Self::from_data(TokenData::FlowSequenceEnd)
    }

    /// Create a FLOW-MAPPING-START token.
    pub fn flow_mapping_start() -> Self {
        Self::from_data(TokenData::FlowMappingStart)
    }

    /// Create a FLOW-MAPPING-END token.
    pub fn flow_mapping_end() -> Self {
        Self::from_data(TokenData::FlowMappingEnd)
    }

    /// Create a BLOCK-ENTRY token.
    pub fn block_entry() -> Self {
        Self::from_data(TokenData::BlockEntry)
    }

    /// Create a FLOW-ENTRY token.
    pub fn flow_entry() -> Self {
        Self::from_data(TokenData::FlowEntry)
    }

    /// Create a KEY token.
    pub fn key() -> Self {
        Self::from_data(TokenData::Key)
    }

    /// Create a VALUE token.
    pub fn value() -> Self {
        Self::from_data(TokenData::Value)
    }

    /// Create an ALIAS token.
    pub fn alias(value: &str) -> Self {
        Self::from_data(TokenData::Alias {
            value: String::from(value),
        })
    }

    /// Create an ANCHOR token.
    pub fn anchor(value: &str) -> Self {
        Self::from_data(TokenData::Anchor {
            value: String::from(value),
        })
    }

    /// Create a TAG token.
    pub fn tag(handle: &str, suffix: &str) -> Self {
        Self::from_data(TokenData::Tag {
            handle: String::from(handle),
            suffix: String::from(suffix),
        })
    }

    /// Create a SCALAR token.
    pub fn scalar(value: &str, style: ScalarStyle) -> Self {
        Self::from_data(TokenData::Scalar {
            value: String::from(value),
            style,
        })
    }

    /// Create a COMMENT token.
    pub fn comment(kind: CommentKind, text: &str) -> Self {
        Self::from_data(TokenData::Comment {
            kind,
            text: String::from(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_build_the_expected_token_data() {
        assert!(matches!(
            Token::stream_start(Encoding::Utf8).data,
            TokenData::StreamStart {
                encoding: Encoding::Utf8
            }
        ));
        assert!(matches!(Token::stream_end().data, TokenData::StreamEnd));
        assert!(matches!(
            Token::version_directive(1, 1).data,
            TokenData::VersionDirective { major: 1, minor: 1 }
        ));
        assert!(matches!(
            &Token::tag_directive("!!", "tag:yaml.org,2002:").data,
            TokenData::TagDirective { handle, prefix }
                if handle == "!!" && prefix == "tag:yaml.org,2002:"
        ));
        assert!(matches!(Token::document_start().data, TokenData::DocumentStart));
        assert!(matches!(Token::document_end().data, TokenData::DocumentEnd));
        assert!(matches!(
            Token::block_sequence_start().data,
            TokenData::BlockSequenceStart
        ));
        assert!(matches!(
            Token::block_mapping_start().data,
            TokenData::BlockMappingStart
        ));
        assert!(matches!(Token::block_end().data, TokenData::BlockEnd));
        assert!(matches!(
            Token::flow_sequence_start().data,
            TokenData::FlowSequenceStart
        ));
        assert!(matches!(
            Token::flow_sequence_end().data,
            TokenData::FlowSequenceEnd
        ));
        assert!(matches!(
            Token::flow_mapping_start().data,
            TokenData::FlowMappingStart
        ));
        assert!(matches!(
            Token::flow_mapping_end().data,
            TokenData::FlowMappingEnd
        ));
        assert!(matches!(Token::block_entry().data, TokenData::BlockEntry));
        assert!(matches!(Token::flow_entry().data, TokenData::FlowEntry));
        assert!(matches!(Token::key().data, TokenData::Key));
        assert!(matches!(Token::value().data, TokenData::Value));
        assert!(matches!(&Token::alias("x").data, TokenData::Alias { value } if value == "x"));
        assert!(matches!(&Token::anchor("x").data, TokenData::Anchor { value } if value == "x"));
        assert!(matches!(
            &Token::tag("!", "foo").data,
            TokenData::Tag { handle, suffix } if handle == "!" && suffix == "foo"
        ));
        assert!(matches!(
            &Token::scalar("v", ScalarStyle::Plain).data,
            TokenData::Scalar { value, style: ScalarStyle::Plain } if value == "v"
        ));
        assert!(matches!(
            &Token::comment(CommentKind::Block, "hi").data,
            TokenData::Comment { kind: CommentKind::Block, text } if text == "hi"
        ));
    }
}
