use crate::reader::Reader;
use crate::scanner::Scanner;
use crate::{
    CommentKind, Event, EventData, MappingStyle, Mark, Options, ParserError, ScalarStyle,
    SequenceStyle, TagDirective, TokenData, VersionDirective, DEFAULT_PRIMARY_TAG_HANDLE,
    DEFAULT_SECONDARY_TAG_HANDLE, DEFAULT_SECONDARY_TAG_PREFIX,
};

/// The states of the parser's LL(1) state machine. Each variant is one
/// production; `state_machine` dispatches on it, and most productions push a
/// follow-up state onto `states` before recursing into
/// [`Parser::parse_node`].
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
enum ParserState {
    #[default]
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockNodeOrIndentlessSequence,
    FlowNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

/// Short, payload-free label for an event kind, so `log::trace!` call sites
/// never echo scalar contents into the log.
fn event_kind_name(data: &EventData) -> &'static str {
    match data {
        EventData::StreamStart { .. } => "StreamStart",
        EventData::StreamEnd => "StreamEnd",
        EventData::DocumentStart { .. } => "DocumentStart",
        EventData::DocumentEnd { .. } => "DocumentEnd",
        EventData::Alias { .. } => "Alias",
        EventData::Scalar { .. } => "Scalar",
        EventData::SequenceStart { .. } => "SequenceStart",
        EventData::SequenceEnd => "SequenceEnd",
        EventData::MappingStart { .. } => "MappingStart",
        EventData::MappingEnd => "MappingEnd",
        EventData::Comment { .. } => "Comment",
    }
}

/// Turns a token stream into a flat sequence of events.
///
/// Tags are resolved against the currently installed `%TAG` directives as
/// nodes are parsed. The two default handles (`!` and `!!`) are installed
/// before the first document and never removed; an explicit `%TAG` handle
/// set by one document carries forward into later documents and stays in
/// effect until a later `%TAG` directive for the same handle overrides it
/// (a deliberate deviation from strict per-document directive scoping).
pub struct Parser<'r> {
    scanner: Scanner<'r>,
    parse_comments: bool,
    nesting_depth_limit: u32,
    states: Vec<ParserState>,
    state: ParserState,
    marks: Vec<Mark>,
    tag_directives: Vec<TagDirective>,
    pending: Option<Event>,
    done: bool,
}

impl<'r> Parser<'r> {
    /// Create a parser reading from `reader`, consuming the scanner/parser
    /// fields of `options` ([`Options::parse_comments`] and
    /// [`Options::nesting_depth_limit`]); the remaining fields exist only to
    /// be forwarded to a composer collaborator.
    pub fn new(reader: Reader<'r>, options: Options) -> Self {
        Parser {
            scanner: Scanner::new(reader, &options),
            parse_comments: options.parse_comments,
            nesting_depth_limit: options.nesting_depth_limit,
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(4),
            pending: None,
            done: false,
        }
    }

    /// Check whether the next event satisfies `predicate`, without consuming
    /// it.
    pub fn check_event(&mut self, predicate: impl FnOnce(&EventData) -> bool) -> Result<bool, ParserError> {
        Ok(self.peek_event()?.map(predicate).unwrap_or(false))
    }

    /// Look at the next event without consuming it.
    pub fn peek_event(&mut self) -> Result<Option<&Event>, ParserError> {
        if self.pending.is_none() {
            self.pending = self.produce()?;
        }
        Ok(self.pending.as_ref())
    }

    /// Parse the input stream and return the next event, or `None` once
    /// [`EventData::StreamEnd`] has already been returned.
    pub fn next_event(&mut self) -> Result<Option<Event>, ParserError> {
        if let Some(event) = self.pending.take() {
            return Ok(Some(event));
        }
        self.produce()
    }

    fn produce(&mut self) -> Result<Option<Event>, ParserError> {
        if self.done {
            return Ok(None);
        }
        if self.parse_comments && matches!(self.scanner.peek_token()?.data, TokenData::Comment { .. }) {
            let token = self.scanner.next_token()?;
            let TokenData::Comment { kind, text } = token.data else {
                unreachable!("just matched TokenData::Comment")
            };
            return Ok(Some(Event {
                data: EventData::Comment { kind, text },
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            }));
        }
        let event = self.state_machine()?;
        log::trace!(
            "parser: emitted {} at {}:{}, next state {:?}",
            event_kind_name(&event.data),
            event.start_mark.line + 1,
            event.start_mark.column + 1,
            self.state
        );
        if matches!(event.data, EventData::StreamEnd) {
            self.done = true;
        }
        Ok(Some(event))
    }

    fn err<T>(&self, problem: &'static str, mark: Mark) -> Result<T, ParserError> {
        Err(ParserError::Problem { problem, mark })
    }

    fn err_context<T>(
        &self,
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    ) -> Result<T, ParserError> {
        Err(ParserError::ProblemWithContext {
            context,
            context_mark,
            problem,
            mark,
        })
    }

    /// Push a follow-up state, enforcing [`Options::nesting_depth_limit`].
    fn enter(&mut self, state: ParserState, mark: Mark) -> Result<(), ParserError> {
        if self.states.len() as u32 >= self.nesting_depth_limit {
            return self.err("exceeded the configured nesting depth limit", mark);
        }
        self.states.push(state);
        Ok(())
    }

    fn empty_scalar(mark: Mark) -> Event {
        Event {
            data: EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            start_mark: mark.clone(),
            end_mark: mark,
        }
    }

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            ParserState::FlowNode => self.parse_node(false, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            ParserState::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            ParserState::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => unreachable!("parser end state is never scheduled to run again"),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        let TokenData::StreamStart { encoding } = token.data else {
            let mark = token.start_mark.clone();
            return self.err("did not find expected <stream-start>", mark);
        };
        let event = Event {
            data: EventData::StreamStart { encoding },
            start_mark: token.start_mark.clone(),
            end_mark: token.end_mark.clone(),
        };
        self.state = ParserState::ImplicitDocumentStart;
        self.scanner.next_token()?;
        Ok(event)
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        if !implicit {
            while matches!(self.scanner.peek_token()?.data, TokenData::DocumentEnd) {
                self.scanner.next_token()?;
            }
        }
        let token = self.scanner.peek_token()?;
        if implicit
            && !matches!(
                token.data,
                TokenData::VersionDirective { .. }
                    | TokenData::TagDirective { .. }
                    | TokenData::DocumentStart
                    | TokenData::StreamEnd
            )
        {
            let start_mark = token.start_mark.clone();
            let end_mark = token.end_mark.clone();
            self.process_directives()?;
            self.enter(ParserState::DocumentEnd, start_mark.clone())?;
            self.state = ParserState::BlockNode;
            return Ok(Event {
                data: EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: Vec::new(),
                    implicit: true,
                },
                start_mark,
                end_mark,
            });
        }
        if !matches!(token.data, TokenData::StreamEnd) {
            let start_mark = token.start_mark.clone();
            let (version_directive, tag_directives) = self.process_directives()?;
            let token = self.scanner.peek_token()?;
            if matches!(token.data, TokenData::DocumentStart) {
                let end_mark = token.end_mark.clone();
                self.scanner.next_token()?;
                self.enter(ParserState::DocumentEnd, start_mark.clone())?;
                self.state = ParserState::DocumentContent;
                return Ok(Event {
                    data: EventData::DocumentStart {
                        version_directive,
                        tag_directives,
                        implicit: false,
                    },
                    start_mark,
                    end_mark,
                });
            }
            let token_mark = token.start_mark.clone();
            return self.err("did not find expected <document start>", token_mark);
        }
        let start_mark = token.start_mark.clone();
        let end_mark = token.end_mark.clone();
        self.state = ParserState::End;
        self.scanner.next_token()?;
        Ok(Event {
            data: EventData::StreamEnd,
            start_mark,
            end_mark,
        })
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        if matches!(
            token.data,
            TokenData::VersionDirective { .. }
                | TokenData::TagDirective { .. }
                | TokenData::DocumentStart
                | TokenData::DocumentEnd
                | TokenData::StreamEnd
        ) {
            let mark = token.start_mark.clone();
            self.state = self.states.pop().expect("document content always has a caller state");
            return Ok(Self::empty_scalar(mark));
        }
        self.parse_node(true, false)
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        let start_mark = token.start_mark.clone();
        let mut end_mark = start_mark.clone();
        let mut implicit = true;
        if matches!(token.data, TokenData::DocumentEnd) {
            end_mark = token.end_mark.clone();
            self.scanner.next_token()?;
            implicit = false;
        }
        // Deliberately not cleared: `%TAG` handles set by this document carry
        // forward into the next one (see `process_directives`).
        self.state = ParserState::DocumentStart;
        Ok(Event {
            data: EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        })
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        if matches!(token.data, TokenData::Alias { .. }) {
            let token = self.scanner.next_token()?;
            let TokenData::Alias { value } = token.data else {
                unreachable!("just matched TokenData::Alias")
            };
            let event = Event {
                data: EventData::Alias { anchor: value },
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.state = self.states.pop().expect("parse_node always has a caller state");
            return Ok(event);
        }

        let mut start_mark = token.start_mark.clone();
        let mut end_mark = start_mark.clone();
        let mut anchor: Option<String> = None;
        let mut tag_handle: Option<String> = None;
        let mut tag_suffix: Option<String> = None;
        let mut tag_mark = Mark::default();

        if matches!(token.data, TokenData::Anchor { .. }) {
            let token = self.scanner.next_token()?;
            let TokenData::Anchor { value } = token.data else {
                unreachable!("just matched TokenData::Anchor")
            };
            anchor = Some(value);
            start_mark = token.start_mark;
            end_mark = token.end_mark;
            let token = self.scanner.peek_token()?;
            if matches!(token.data, TokenData::Tag { .. }) {
                let token = self.scanner.next_token()?;
                let TokenData::Tag { handle, suffix } = token.data else {
                    unreachable!("just matched TokenData::Tag")
                };
                tag_handle = Some(handle);
                tag_suffix = Some(suffix);
                tag_mark = token.start_mark;
                end_mark = token.end_mark;
            }
        } else if matches!(token.data, TokenData::Tag { .. }) {
            let token = self.scanner.next_token()?;
            let TokenData::Tag { handle, suffix } = token.data else {
                unreachable!("just matched TokenData::Tag")
            };
            tag_handle = Some(handle);
            tag_suffix = Some(suffix);
            tag_mark = token.start_mark.clone();
            start_mark = tag_mark.clone();
            end_mark = token.end_mark;
            let token = self.scanner.peek_token()?;
            if matches!(token.data, TokenData::Anchor { .. }) {
                let token = self.scanner.next_token()?;
                let TokenData::Anchor { value } = token.data else {
                    unreachable!("just matched TokenData::Anchor")
                };
                anchor = Some(value);
                end_mark = token.end_mark;
            }
        }

        let tag = match &tag_handle {
            None => None,
            Some(handle) if handle.is_empty() => tag_suffix.clone(),
            Some(handle) => {
                let resolved = self
                    .tag_directives
                    .iter()
                    .find(|directive| &directive.handle == handle)
                    .map(|directive| format!("{}{}", directive.prefix, tag_suffix.as_deref().unwrap_or("")));
                match resolved {
                    Some(tag) => Some(tag),
                    None => {
                        return self.err_context(
                            "while parsing a node",
                            start_mark,
                            "found undefined tag handle",
                            tag_mark,
                        );
                    }
                }
            }
        };

        let token = self.scanner.peek_token()?;
        let implicit = tag.is_none() || tag.as_deref() == Some("");

        if indentless_sequence && matches!(token.data, TokenData::BlockEntry) {
            end_mark = token.end_mark.clone();
            self.state = ParserState::IndentlessSequenceEntry;
            return Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            });
        }
        if matches!(token.data, TokenData::Scalar { .. }) {
            let token = self.scanner.next_token()?;
            let TokenData::Scalar { value, style } = token.data else {
                unreachable!("just matched TokenData::Scalar")
            };
            end_mark = token.end_mark;
            let mut plain_implicit = false;
            let mut quoted_implicit = false;
            if (style == ScalarStyle::Plain && tag.is_none()) || tag.as_deref() == Some("!") {
                plain_implicit = true;
            } else if tag.is_none() {
                quoted_implicit = true;
            }
            let event = Event {
                data: EventData::Scalar {
                    anchor,
                    tag,
                    value,
                    plain_implicit,
                    quoted_implicit,
                    style,
                },
                start_mark,
                end_mark,
            };
            self.state = self.states.pop().expect("parse_node always has a caller state");
            return Ok(event);
        }
        if matches!(token.data, TokenData::FlowSequenceStart) {
            end_mark = token.end_mark.clone();
            self.state = ParserState::FlowSequenceFirstEntry;
            return Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Flow,
                },
                start_mark,
                end_mark,
            });
        }
        if matches!(token.data, TokenData::FlowMappingStart) {
            end_mark = token.end_mark.clone();
            self.state = ParserState::FlowMappingFirstKey;
            return Ok(Event {
                data: EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Flow,
                },
                start_mark,
                end_mark,
            });
        }
        if block && matches!(token.data, TokenData::BlockSequenceStart) {
            end_mark = token.end_mark.clone();
            self.state = ParserState::BlockSequenceFirstEntry;
            return Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            });
        }
        if block && matches!(token.data, TokenData::BlockMappingStart) {
            end_mark = token.end_mark.clone();
            self.state = ParserState::BlockMappingFirstKey;
            return Ok(Event {
                data: EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Block,
                },
                start_mark,
                end_mark,
            });
        }
        if anchor.is_some() || tag.is_some() {
            self.state = self.states.pop().expect("parse_node always has a caller state");
            return Ok(Event {
                data: EventData::Scalar {
                    anchor,
                    tag,
                    value: String::new(),
                    plain_implicit: implicit,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark,
                end_mark,
            });
        }
        let token_mark = token.start_mark.clone();
        self.err_context(
            if block { "while parsing a block node" } else { "while parsing a flow node" },
            start_mark,
            "did not find expected node content",
            token_mark,
        )
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.scanner.peek_token()?.start_mark.clone();
            self.marks.push(mark);
            self.scanner.next_token()?;
        }
        let token = self.scanner.peek_token()?;
        if matches!(token.data, TokenData::BlockEntry) {
            let mark = token.end_mark.clone();
            self.scanner.next_token()?;
            let token = self.scanner.peek_token()?;
            if matches!(token.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                self.state = ParserState::BlockSequenceEntry;
                return Ok(Self::empty_scalar(mark));
            }
            self.enter(ParserState::BlockSequenceEntry, mark)?;
            return self.parse_node(true, false);
        }
        if matches!(token.data, TokenData::BlockEnd) {
            let event = Event {
                data: EventData::SequenceEnd,
                start_mark: token.start_mark.clone(),
                end_mark: token.end_mark.clone(),
            };
            self.state = self.states.pop().expect("block sequence entry always has a caller state");
            self.marks.pop();
            self.scanner.next_token()?;
            return Ok(event);
        }
        let token_mark = token.start_mark.clone();
        let mark = self.marks.pop().expect("block sequence entry always pushes a mark on first entry");
        self.err_context(
            "while parsing a block collection",
            mark,
            "did not find expected '-' indicator",
            token_mark,
        )
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        if matches!(token.data, TokenData::BlockEntry) {
            let mark = token.end_mark.clone();
            self.scanner.next_token()?;
            let token = self.scanner.peek_token()?;
            if matches!(
                token.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::IndentlessSequenceEntry;
                return Ok(Self::empty_scalar(mark));
            }
            self.enter(ParserState::IndentlessSequenceEntry, mark)?;
            return self.parse_node(true, false);
        }
        let event = Event {
            data: EventData::SequenceEnd,
            start_mark: token.start_mark.clone(),
            end_mark: token.end_mark.clone(),
        };
        self.state = self.states.pop().expect("indentless sequence entry always has a caller state");
        Ok(event)
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.scanner.peek_token()?.start_mark.clone();
            self.marks.push(mark);
            self.scanner.next_token()?;
        }
        let token = self.scanner.peek_token()?;
        if matches!(token.data, TokenData::Key) {
            let mark = token.end_mark.clone();
            self.scanner.next_token()?;
            let token = self.scanner.peek_token()?;
            if matches!(token.data, TokenData::Key | TokenData::Value | TokenData::BlockEnd) {
                self.state = ParserState::BlockMappingValue;
                return Ok(Self::empty_scalar(mark));
            }
            self.enter(ParserState::BlockMappingValue, mark)?;
            return self.parse_node(true, true);
        }
        if matches!(token.data, TokenData::BlockEnd) {
            let event = Event {
                data: EventData::MappingEnd,
                start_mark: token.start_mark.clone(),
                end_mark: token.end_mark.clone(),
            };
            self.state = self.states.pop().expect("block mapping key always has a caller state");
            self.marks.pop();
            self.scanner.next_token()?;
            return Ok(event);
        }
        let token_mark = token.start_mark.clone();
        let mark = self.marks.pop().expect("block mapping key always pushes a mark on first entry");
        self.err_context("while parsing a block mapping", mark, "did not find expected key", token_mark)
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        if matches!(token.data, TokenData::Value) {
            let mark = token.end_mark.clone();
            self.scanner.next_token()?;
            let token = self.scanner.peek_token()?;
            if matches!(token.data, TokenData::Key | TokenData::Value | TokenData::BlockEnd) {
                self.state = ParserState::BlockMappingKey;
                return Ok(Self::empty_scalar(mark));
            }
            self.enter(ParserState::BlockMappingKey, mark)?;
            return self.parse_node(true, true);
        }
        let mark = token.start_mark.clone();
        self.state = ParserState::BlockMappingKey;
        Ok(Self::empty_scalar(mark))
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.scanner.peek_token()?.start_mark.clone();
            self.marks.push(mark);
            self.scanner.next_token()?;
        }
        let mut token = self.scanner.peek_token()?;
        if !matches!(token.data, TokenData::FlowSequenceEnd) {
            if !first {
                if matches!(token.data, TokenData::FlowEntry) {
                    self.scanner.next_token()?;
                    token = self.scanner.peek_token()?;
                } else {
                    let token_mark = token.start_mark.clone();
                    let mark = self.marks.pop().expect("flow sequence entry always pushes a mark on first entry");
                    return self.err_context(
                        "while parsing a flow sequence",
                        mark,
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            if matches!(token.data, TokenData::Key) {
                let event = Event {
                    data: EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        style: MappingStyle::Flow,
                    },
                    start_mark: token.start_mark.clone(),
                    end_mark: token.end_mark.clone(),
                };
                self.state = ParserState::FlowSequenceEntryMappingKey;
                self.scanner.next_token()?;
                return Ok(event);
            }
            if !matches!(token.data, TokenData::FlowSequenceEnd) {
                let mark = token.start_mark.clone();
                self.enter(ParserState::FlowSequenceEntry, mark)?;
                return self.parse_node(false, false);
            }
        }
        let event = Event {
            data: EventData::SequenceEnd,
            start_mark: token.start_mark.clone(),
            end_mark: token.end_mark.clone(),
        };
        self.state = self.states.pop().expect("flow sequence entry always has a caller state");
        self.marks.pop();
        self.scanner.next_token()?;
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        if matches!(
            token.data,
            TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
        ) {
            let mark = token.end_mark.clone();
            self.scanner.next_token()?;
            self.state = ParserState::FlowSequenceEntryMappingValue;
            return Ok(Self::empty_scalar(mark));
        }
        let mark = token.start_mark.clone();
        self.enter(ParserState::FlowSequenceEntryMappingValue, mark)?;
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let mut token = self.scanner.peek_token()?;
        if matches!(token.data, TokenData::Value) {
            self.scanner.next_token()?;
            token = self.scanner.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowSequenceEnd) {
                let mark = token.start_mark.clone();
                self.enter(ParserState::FlowSequenceEntryMappingEnd, mark)?;
                return self.parse_node(false, false);
            }
        }
        let mark = token.start_mark.clone();
        self.state = ParserState::FlowSequenceEntryMappingEnd;
        Ok(Self::empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let token = self.scanner.peek_token()?;
        let start_mark = token.start_mark.clone();
        let end_mark = token.end_mark.clone();
        self.state = ParserState::FlowSequenceEntry;
        Ok(Event {
            data: EventData::MappingEnd,
            start_mark,
            end_mark,
        })
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.scanner.peek_token()?.start_mark.clone();
            self.marks.push(mark);
            self.scanner.next_token()?;
        }
        let mut token = self.scanner.peek_token()?;
        if !matches!(token.data, TokenData::FlowMappingEnd) {
            if !first {
                if matches!(token.data, TokenData::FlowEntry) {
                    self.scanner.next_token()?;
                    token = self.scanner.peek_token()?;
                } else {
                    let token_mark = token.start_mark.clone();
                    let mark = self.marks.pop().expect("flow mapping key always pushes a mark on first entry");
                    return self.err_context(
                        "while parsing a flow mapping",
                        mark,
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            if matches!(token.data, TokenData::Key) {
                self.scanner.next_token()?;
                let token = self.scanner.peek_token()?;
                if !matches!(
                    token.data,
                    TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                ) {
                    let mark = token.start_mark.clone();
                    self.enter(ParserState::FlowMappingValue, mark)?;
                    return self.parse_node(false, false);
                }
                let mark = token.start_mark.clone();
                self.state = ParserState::FlowMappingValue;
                return Ok(Self::empty_scalar(mark));
            }
            if !matches!(token.data, TokenData::FlowMappingEnd) {
                let mark = token.start_mark.clone();
                self.enter(ParserState::FlowMappingEmptyValue, mark)?;
                return self.parse_node(false, false);
            }
        }
        let event = Event {
            data: EventData::MappingEnd,
            start_mark: token.start_mark.clone(),
            end_mark: token.end_mark.clone(),
        };
        self.state = self.states.pop().expect("flow mapping key always has a caller state");
        self.marks.pop();
        self.scanner.next_token()?;
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let mut token = self.scanner.peek_token()?;
        if empty {
            let mark = token.start_mark.clone();
            self.state = ParserState::FlowMappingKey;
            return Ok(Self::empty_scalar(mark));
        }
        if matches!(token.data, TokenData::Value) {
            self.scanner.next_token()?;
            token = self.scanner.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                let mark = token.start_mark.clone();
                self.enter(ParserState::FlowMappingKey, mark)?;
                return self.parse_node(false, false);
            }
        }
        let mark = token.start_mark.clone();
        self.state = ParserState::FlowMappingKey;
        Ok(Self::empty_scalar(mark))
    }

    /// Install the default `!`/`!!` handles plus any `%YAML`/`%TAG`
    /// directives at the head of a document; returns what the caller should
    /// attach to its `DocumentStart` event (empty/`None` for an implicit
    /// document, which discards them).
    ///
    /// `%TAG` handles installed by an earlier document are left in
    /// `self.tag_directives` (see `parse_document_end`); an explicit
    /// directive here overrides the same handle's prior prefix rather than
    /// being treated as a duplicate, since only directives *within this
    /// document* may legally duplicate each other.
    fn process_directives(&mut self) -> Result<(Option<VersionDirective>, Vec<TagDirective>), ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = Vec::new();
        loop {
            let token = self.scanner.peek_token()?;
            match &token.data {
                TokenData::VersionDirective { major, minor } => {
                    let (major, minor) = (*major, *minor);
                    let mark = token.start_mark.clone();
                    if version_directive.is_some() {
                        return self.err("found duplicate %YAML directive", mark);
                    }
                    if major != 1 || (minor != 1 && minor != 2) {
                        return self.err("found incompatible YAML document", mark);
                    }
                    version_directive = Some(VersionDirective { major, minor });
                    self.scanner.next_token()?;
                }
                TokenData::TagDirective { .. } => {
                    let token = self.scanner.next_token()?;
                    let TokenData::TagDirective { handle, prefix } = token.data else {
                        unreachable!("just matched TokenData::TagDirective")
                    };
                    let mark = token.start_mark;
                    if tag_directives.iter().any(|d: &TagDirective| d.handle == handle) {
                        return self.err("found duplicate %TAG directive", mark);
                    }
                    let value = TagDirective { handle, prefix };
                    self.set_tag_directive(value.clone());
                    tag_directives.push(value);
                }
                _ => break,
            }
        }
        self.install_default_tag_directive(DEFAULT_PRIMARY_TAG_HANDLE, DEFAULT_PRIMARY_TAG_HANDLE);
        self.install_default_tag_directive(DEFAULT_SECONDARY_TAG_HANDLE, DEFAULT_SECONDARY_TAG_PREFIX);
        Ok((version_directive, tag_directives))
    }

    /// Install or override the handle's prefix; used for explicit `%TAG`
    /// directives, which may legitimately replace a handle carried forward
    /// from an earlier document.
    fn set_tag_directive(&mut self, value: TagDirective) {
        match self.tag_directives.iter_mut().find(|d| d.handle == value.handle) {
            Some(existing) => *existing = value,
            None => self.tag_directives.push(value),
        }
    }

    /// Install a default handle (`!` or `!!`) the first time it's seen;
    /// never overrides a handle this or an earlier document already
    /// declared explicitly.
    fn install_default_tag_directive(&mut self, handle: &str, prefix: &str) {
        if self.tag_directives.iter().any(|d| d.handle == handle) {
            return;
        }
        self.tag_directives.push(TagDirective {
            handle: String::from(handle),
            prefix: String::from(prefix),
        });
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
    fn resolves_a_named_tag_handle() {
        let evs = events("%TAG !e! tag:example.com,2000:\n---\n!e!foo bar\n");
        let scalar = evs
            .iter()
            .find(|e| matches!(e, EventData::Scalar { .. }))
            .expect("expected a scalar");
        assert!(matches!(scalar, EventData::Scalar { tag: Some(tag), .. }
            if tag == "tag:example.com,2000:foo"));
    }

    #[test]
    fn errors_on_undefined_tag_handle() {
        let mut reader = Reader::new();
        let mut bytes = b"!e!foo bar\n".as_slice();
        reader.set_input_string(&mut bytes);
        let mut parser = Parser::new(reader, Options::default());
        let err = loop {
            match parser.next_event() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an error before stream end"),
                Err(e) => break e,
            }
        };
        assert!(matches!(
            err,
            ParserError::ProblemWithContext {
                problem: "found undefined tag handle",
                ..
            }
        ));
    }

    #[test]
    fn carries_a_tag_handle_forward_across_documents() {
        let evs = events("%TAG !e! tag:ex,2000:\n---\n!e!a x\n---\n!e!b y\n");
        let tags: Vec<&str> = evs
            .iter()
            .filter_map(|e| match e {
                EventData::Scalar { tag: Some(tag), .. } => Some(tag.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["tag:ex,2000:a", "tag:ex,2000:b"]);
    }

    #[test]
    fn a_later_documents_tag_directive_overrides_the_carried_forward_one() {
        let evs = events("%TAG !e! tag:ex,2000:\n---\n!e!a x\n---\n%TAG !e! tag:other,2000:\n---\n!e!b y\n");
        let tags: Vec<&str> = evs
            .iter()
            .filter_map(|e| match e {
                EventData::Scalar { tag: Some(tag), .. } => Some(tag.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["tag:ex,2000:a", "tag:other,2000:b"]);
    }

    #[test]
    fn errors_on_duplicate_tag_directive_within_the_same_document() {
        let mut reader = Reader::new();
        let mut bytes = b"%TAG !e! tag:ex,2000:\n%TAG !e! tag:other,2000:\n---\nfoo\n".as_slice();
        reader.set_input_string(&mut bytes);
        let mut parser = Parser::new(reader, Options::default());
        let err = loop {
            match parser.next_event() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an error before stream end"),
                Err(e) => break e,
            }
        };
        assert!(matches!(
            err,
            ParserError::Problem {
                problem: "found duplicate %TAG directive",
                ..
            }
        ));
    }

    #[test]
    fn resolves_an_alias() {
        let evs = events("&a foo: *a\n");
        assert!(evs.iter().any(|e| matches!(e, EventData::Alias { anchor } if anchor == "a")));
    }

    #[test]
    fn enforces_the_nesting_depth_limit() {
        let mut input = String::new();
        for _ in 0..60 {
            input.push_str("- ");
        }
        input.push_str("x\n");
        let mut reader = Reader::new();
        let mut bytes = input.as_bytes();
        reader.set_input_string(&mut bytes);
        let mut options = Options::default();
        options.nesting_depth_limit = 10;
        let mut parser = Parser::new(reader, options);
        let err = loop {
            match parser.next_event() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an error before stream end"),
                Err(e) => break e,
            }
        };
        assert!(matches!(
            err,
            ParserError::Problem {
                problem: "exceeded the configured nesting depth limit",
                ..
            }
        ));
    }

    #[test]
    fn mirrors_comments_as_events_when_enabled() {
        let mut reader = Reader::new();
        let mut bytes = b"# hi\nkey: value\n".as_slice();
        reader.set_input_string(&mut bytes);
        let mut options = Options::default();
        options.parse_comments = true;
        let mut parser = Parser::new(reader, options);
        let mut saw_comment = false;
        while let Some(event) = parser.next_event().unwrap() {
            if let EventData::Comment { kind, text } = &event.data {
                assert_eq!(*kind, CommentKind::Block);
                assert_eq!(text, "hi");
                saw_comment = true;
            }
        }
        assert!(saw_comment);
    }
}
