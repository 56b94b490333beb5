use alloc::collections::VecDeque;

use crate::macros::{is_alpha, is_anchor_char, is_blank, is_blankz, is_break, is_breakz};
use crate::reader::Reader;
use crate::{CommentKind, Mark, Options, ScalarStyle, ScannerError, Token, TokenData};

/// How long version directive numbers libyaml-compatible implementations
/// accept before giving up.
const MAX_VERSION_NUMBER_LENGTH: usize = 9;

/// Short, payload-free label for a token kind, for `log::trace!` call sites
/// that must not echo scalar contents into the log.
fn token_kind_name(data: &TokenData) -> &'static str {
    match data {
        TokenData::StreamStart { .. } => "StreamStart",
        TokenData::StreamEnd => "StreamEnd",
        TokenData::VersionDirective { .. } => "VersionDirective",
        TokenData::TagDirective { .. } => "TagDirective",
        TokenData::DocumentStart => "DocumentStart",
        TokenData::DocumentEnd => "DocumentEnd",
        TokenData::BlockSequenceStart => "BlockSequenceStart",
        TokenData::BlockMappingStart => "BlockMappingStart",
        TokenData::BlockEnd => "BlockEnd",
        TokenData::FlowSequenceStart => "FlowSequenceStart",
        TokenData::FlowSequenceEnd => "FlowSequenceEnd",
        TokenData::FlowMappingStart => "FlowMappingStart",
        TokenData::FlowMappingEnd => "FlowMappingEnd",
        TokenData::BlockEntry => "BlockEntry",
        TokenData::FlowEntry => "FlowEntry",
        TokenData::Key => "Key",
        TokenData::Value => "Value",
        TokenData::Alias { .. } => "Alias",
        TokenData::Anchor { .. } => "Anchor",
        TokenData::Tag { .. } => "Tag",
        TokenData::Scalar { .. } => "Scalar",
        TokenData::Comment { .. } => "Comment",
    }
}

/// A pending position for the key side of an implicit mapping entry.
#[derive(Clone)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Mark,
}

impl SimpleKey {
    fn none() -> Self {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark: Mark::default(),
        }
    }
}

/// Turns a code point stream into a flat sequence of tokens.
///
/// The scanner keeps a small queue of already-produced tokens because a few
/// productions -- most notably simple keys -- aren't known to start a block
/// mapping until the scanner has looked arbitrarily far ahead for a `:`. When
/// that `:` turns up, a `Key`/`BlockMappingStart` pair is spliced back into
/// the queue at the position the key itself was scanned.
pub struct Scanner<'r> {
    reader: Reader<'r>,
    parse_comments: bool,
    tokens: VecDeque<Token>,
    tokens_parsed: usize,
    stream_start_produced: bool,
    flow_level: usize,
    indent: isize,
    indents: Vec<isize>,
    simple_keys: Vec<SimpleKey>,
    allow_simple_key: bool,
}

impl<'r> Scanner<'r> {
    pub fn new(reader: Reader<'r>, options: &Options) -> Self {
        Scanner {
            reader,
            parse_comments: options.parse_comments,
            tokens: VecDeque::new(),
            tokens_parsed: 0,
            stream_start_produced: false,
            flow_level: 0,
            indent: -1,
            indents: Vec::new(),
            simple_keys: Vec::new(),
            allow_simple_key: true,
        }
    }

    /// Check whether the next token satisfies `predicate`, without consuming
    /// it.
    pub fn check_token(&mut self, predicate: impl FnOnce(&TokenData) -> bool) -> Result<bool, ScannerError> {
        Ok(predicate(&self.peek_token()?.data))
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token, ScannerError> {
        self.fetch_more_tokens()?;
        Ok(self
            .tokens
            .front()
            .expect("fetch_more_tokens always leaves at least one token queued"))
    }

    /// Consume and return the next token. Once a STREAM-END token has been
    /// produced, every subsequent call returns another one.
    pub fn next_token(&mut self) -> Result<Token, ScannerError> {
        self.fetch_more_tokens()?;
        let token = self
            .tokens
            .pop_front()
            .expect("fetch_more_tokens always leaves at least one token queued");
        self.tokens_parsed += 1;
        log::trace!(
            "scanner: fetched {} at {}:{}",
            token_kind_name(&token.data),
            token.start_mark.line + 1,
            token.start_mark.column + 1
        );
        Ok(token)
    }

    fn mark(&self) -> Mark {
        self.reader.mark()
    }

    fn peek(&mut self, offset: usize) -> Result<Option<char>, ScannerError> {
        Ok(self.reader.peek(offset)?)
    }

    fn check(&mut self, offset: usize, ch: char) -> Result<bool, ScannerError> {
        Ok(self.peek(offset)? == Some(ch))
    }

    fn skip(&mut self) -> Result<(), ScannerError> {
        Ok(self.reader.skip()?)
    }

    fn skip_n(&mut self, n: usize) -> Result<(), ScannerError> {
        Ok(self.reader.skip_n(n)?)
    }

    fn skip_line(&mut self) -> Result<(), ScannerError> {
        Ok(self.reader.skip_line()?)
    }

    fn read(&mut self, out: &mut String) -> Result<(), ScannerError> {
        Ok(self.reader.read(out)?)
    }

    fn read_line(&mut self, out: &mut String) -> Result<(), ScannerError> {
        Ok(self.reader.read_line(out)?)
    }

    fn column(&self) -> usize {
        self.reader.position().2
    }

    fn err<T>(&self, context: &'static str, context_mark: Mark, problem: &'static str) -> Result<T, ScannerError> {
        Err(ScannerError::Problem {
            context,
            context_mark,
            problem,
            problem_mark: self.mark(),
        })
    }

    // -- Token fetching, the scanner's public-facing driver loop ---------

    fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more_tokens = self.tokens.is_empty();
            if !need_more_tokens {
                self.stale_simple_keys()?;
                for key in &self.simple_keys {
                    if key.possible && key.token_number == self.tokens_parsed {
                        need_more_tokens = true;
                        break;
                    }
                }
            }
            if !need_more_tokens {
                break;
            }
            self.fetch_next_token()?;
        }
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.reader.ensure(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        if self.scan_to_next_token()? {
            return Ok(());
        }
        self.stale_simple_keys()?;
        let column = self.column() as isize;
        self.unroll_indent(column);

        if self.peek(0)?.is_none() {
            return self.fetch_stream_end();
        }
        let at_col0 = self.column() == 0;
        if at_col0 && self.check(0, '%')? {
            return self.fetch_directive();
        }
        if at_col0
            && self.check(0, '-')?
            && self.check(1, '-')?
            && self.check(2, '-')?
            && is_blankz(self.peek(3)?)
        {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if at_col0
            && self.check(0, '.')?
            && self.check(1, '.')?
            && self.check(2, '.')?
            && is_blankz(self.peek(3)?)
        {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        if self.check(0, '[')? {
            return self.fetch_flow_collection_start(TokenData::FlowSequenceStart);
        }
        if self.check(0, '{')? {
            return self.fetch_flow_collection_start(TokenData::FlowMappingStart);
        }
        if self.check(0, ']')? {
            return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd);
        }
        if self.check(0, '}')? {
            return self.fetch_flow_collection_end(TokenData::FlowMappingEnd);
        }
        if self.check(0, ',')? {
            return self.fetch_flow_entry();
        }
        if self.check(0, '-')? && is_blankz(self.peek(1)?) {
            return self.fetch_block_entry();
        }
        if self.check(0, '?')? && (self.flow_level != 0 || is_blankz(self.peek(1)?)) {
            return self.fetch_key();
        }
        if self.check(0, ':')? && (self.flow_level != 0 || is_blankz(self.peek(1)?)) {
            return self.fetch_value();
        }
        if self.check(0, '*')? {
            return self.fetch_anchor(true);
        }
        if self.check(0, '&')? {
            return self.fetch_anchor(false);
        }
        if self.check(0, '!')? {
            return self.fetch_tag();
        }
        if self.check(0, '|')? && self.flow_level == 0 {
            return self.fetch_block_scalar(true);
        }
        if self.check(0, '>')? && self.flow_level == 0 {
            return self.fetch_block_scalar(false);
        }
        if self.check(0, '\'')? {
            return self.fetch_flow_scalar(true);
        }
        if self.check(0, '"')? {
            return self.fetch_flow_scalar(false);
        }

        let c0 = self.peek(0)?;
        let is_indicator = matches!(
            c0,
            Some('-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%'
                | '@' | '`')
        );
        let starts_plain_scalar = !(is_blankz(c0) || is_indicator)
            || (c0 == Some('-') && !is_blank(self.peek(1)?))
            || (self.flow_level == 0 && matches!(c0, Some('?' | ':')) && !is_blankz(self.peek(1)?));
        if starts_plain_scalar {
            return self.fetch_plain_scalar();
        }

        self.err(
            "while scanning for the next token",
            self.mark(),
            "found character that cannot start any token",
        )
    }

    /// Skip whitespace, comments and blank lines ahead of the next
    /// significant character. When [`Options::parse_comments`] is set this
    /// may itself queue a `Comment` token and return `true`, telling the
    /// caller to return immediately rather than dispatch on the character
    /// now under the cursor (which hasn't been re-examined).
    fn scan_to_next_token(&mut self) -> Result<bool, ScannerError> {
        loop {
            if self.column() == 0 && self.check(0, '\u{feff}')? {
                self.skip()?;
            }
            let at_line_start = self.column() == 0;
            while self.check(0, ' ')? || ((self.flow_level != 0 || !self.allow_simple_key) && self.check(0, '\t')?) {
                self.skip()?;
            }
            if self.check(0, '#')? {
                let start_mark = self.mark();
                self.skip()?;
                let mut text = String::new();
                while !is_breakz(self.peek(0)?) {
                    self.read(&mut text)?;
                }
                let end_mark = self.mark();
                if self.parse_comments {
                    let kind = if at_line_start { CommentKind::Block } else { CommentKind::InLine };
                    let token = Token::new(
                        TokenData::Comment {
                            kind,
                            text: text.trim().to_string(),
                        },
                        start_mark,
                        end_mark,
                    );
                    self.tokens.push_back(token);
                    if is_break(self.peek(0)?) {
                        self.skip_line()?;
                        if self.flow_level == 0 {
                            self.allow_simple_key = true;
                        }
                    }
                    return Ok(true);
                }
            } else if at_line_start && is_break(self.peek(0)?) && self.parse_comments {
                let mark = self.mark();
                self.tokens.push_back(Token::new(
                    TokenData::Comment {
                        kind: CommentKind::BlankLine,
                        text: String::new(),
                    },
                    mark.clone(),
                    mark,
                ));
                self.skip_line()?;
                if self.flow_level == 0 {
                    self.allow_simple_key = true;
                }
                return Ok(true);
            }
            if !is_break(self.peek(0)?) {
                break;
            }
            self.skip_line()?;
            if self.flow_level == 0 {
                self.allow_simple_key = true;
            }
        }
        Ok(false)
    }

    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let (index, line, _) = self.reader.position();
        let current_mark = self.mark();
        for key in &mut self.simple_keys {
            if key.possible && (key.mark.line < line || key.mark.index + 1024 < index) {
                if key.required {
                    return Err(ScannerError::Problem {
                        context: "while scanning a simple key",
                        context_mark: key.mark.clone(),
                        problem: "could not find expected ':'",
                        problem_mark: current_mark,
                    });
                }
                log::debug!(
                    "scanner: simple key at {}:{} went stale",
                    key.mark.line + 1,
                    key.mark.column + 1
                );
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let required = self.flow_level == 0 && self.indent == self.column() as isize;
        if self.allow_simple_key {
            let key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark: self.mark(),
            };
            self.remove_simple_key()?;
            *self.simple_keys.last_mut().expect("stream start always pushes one") = key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let key = self.simple_keys.last_mut().expect("stream start always pushes one");
        if key.possible && key.required {
            let mark = key.mark.clone();
            return self.err("while scanning a simple key", mark, "could not find expected ':'");
        }
        self.simple_keys.last_mut().unwrap().possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::none());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level != 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    fn roll_indent(
        &mut self,
        column: isize,
        number: Option<usize>,
        data: TokenData,
        mark: Mark,
    ) -> Result<(), ScannerError> {
        if self.flow_level != 0 {
            return Ok(());
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token::new(data, mark.clone(), mark);
            match number {
                None => self.tokens.push_back(token),
                Some(n) => self.tokens.insert(n - self.tokens_parsed, token),
            }
        }
        Ok(())
    }

    fn unroll_indent(&mut self, column: isize) {
        if self.flow_level != 0 {
            return;
        }
        while self.indent > column {
            let mark = self.mark();
            self.tokens.push_back(Token::new(TokenData::BlockEnd, mark.clone(), mark));
            self.indent = self.indents.pop().expect("indent stack never underflows");
            log::debug!("scanner: unwound indentation to column {}", self.indent);
        }
    }

    // -- Individual token fetchers ----------------------------------------

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::none());
        self.allow_simple_key = true;
        self.stream_start_produced = true;
        let mark = self.mark();
        let encoding = self.reader.encoding;
        self.tokens
            .push_back(Token::new(TokenData::StreamStart { encoding }, mark.clone(), mark));
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.stream_end_mark();
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.allow_simple_key = false;
        self.tokens.push_back(Token::new(TokenData::StreamEnd, mark.clone(), mark));
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.allow_simple_key = false;
        let start_mark = self.mark();
        self.skip_n(3)?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.allow_simple_key = true;
        let start_mark = self.mark();
        self.skip()?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.allow_simple_key = false;
        let start_mark = self.mark();
        self.skip()?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.allow_simple_key = true;
        let start_mark = self.mark();
        self.skip()?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(TokenData::FlowEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return self.err(
                    "",
                    self.mark(),
                    "block sequence entries are not allowed in this context",
                );
            }
            let column = self.column() as isize;
            let mark = self.mark();
            self.roll_indent(column, None, TokenData::BlockSequenceStart, mark)?;
        }
        self.remove_simple_key()?;
        self.allow_simple_key = true;
        let start_mark = self.mark();
        self.skip()?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(TokenData::BlockEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.allow_simple_key {
                return self.err("", self.mark(), "mapping keys are not allowed in this context");
            }
            let column = self.column() as isize;
            let mark = self.mark();
            self.roll_indent(column, None, TokenData::BlockMappingStart, mark)?;
        }
        self.remove_simple_key()?;
        self.allow_simple_key = self.flow_level == 0;
        let start_mark = self.mark();
        self.skip()?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(TokenData::Key, start_mark, end_mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let last = self.simple_keys.len() - 1;
        if self.simple_keys[last].possible {
            let key = self.simple_keys[last].clone();
            log::debug!(
                "scanner: simple key at {}:{} resolved, retro-injecting Key",
                key.mark.line + 1,
                key.mark.column + 1
            );
            let token = Token::new(TokenData::Key, key.mark.clone(), key.mark.clone());
            self.tokens.insert(key.token_number - self.tokens_parsed, token);
            self.simple_keys[last].possible = false;
            self.roll_indent(
                key.mark.column as isize,
                Some(key.token_number),
                TokenData::BlockMappingStart,
                key.mark,
            )?;
            self.allow_simple_key = false;
        } else {
            if self.flow_level == 0 {
                if !self.allow_simple_key {
                    return self.err("", self.mark(), "mapping values are not allowed in this context");
                }
                let column = self.column() as isize;
                let mark = self.mark();
                self.roll_indent(column, None, TokenData::BlockMappingStart, mark)?;
            }
            self.allow_simple_key = self.flow_level == 0;
        }
        let start_mark = self.mark();
        self.skip()?;
        let end_mark = self.mark();
        self.tokens.push_back(Token::new(TokenData::Value, start_mark, end_mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, is_alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(is_alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.allow_simple_key = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    // -- Scanning of individual productions --------------------------------

    fn scan_directive(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.mark();
        self.skip()?;
        let name = self.scan_directive_name(start_mark.clone())?;
        let data = if name == "YAML" {
            let (major, minor) = self.scan_version_directive_value(start_mark.clone())?;
            TokenData::VersionDirective { major, minor }
        } else if name == "TAG" {
            let (handle, prefix) = self.scan_tag_directive_value(start_mark.clone())?;
            TokenData::TagDirective { handle, prefix }
        } else {
            return self.err("while scanning a directive", start_mark, "found unknown directive name");
        };
        let end_mark = self.mark();

        while is_blank(self.peek(0)?) {
            self.skip()?;
        }
        if self.check(0, '#')? {
            while !is_breakz(self.peek(0)?) {
                self.skip()?;
            }
        }
        if !is_breakz(self.peek(0)?) {
            return self.err(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
            );
        }
        if is_break(self.peek(0)?) {
            self.skip_line()?;
        }
        Ok(Token::new(data, start_mark, end_mark))
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        let mut name = String::new();
        while is_alpha(self.peek(0)?) {
            self.read(&mut name)?;
        }
        if name.is_empty() {
            return self.err(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
            );
        }
        if !is_blankz(self.peek(0)?) {
            return self.err(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
            );
        }
        Ok(name)
    }

    fn scan_version_directive_value(&mut self, start_mark: Mark) -> Result<(i32, i32), ScannerError> {
        while is_blank(self.peek(0)?) {
            self.skip()?;
        }
        let major = self.scan_version_directive_number(start_mark.clone())?;
        if self.peek(0)? != Some('.') {
            return self.err(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
            );
        }
        self.skip()?;
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Mark) -> Result<i32, ScannerError> {
        let mut value: i32 = 0;
        let mut length = 0usize;
        while let Some(digit) = self.peek(0)?.and_then(|ch| ch.to_digit(10)) {
            length += 1;
            if length > MAX_VERSION_NUMBER_LENGTH {
                return self.err(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                );
            }
            value = value * 10 + digit as i32;
            self.skip()?;
        }
        if length == 0 {
            return self.err(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
            );
        }
        Ok(value)
    }

    fn scan_tag_directive_value(&mut self, start_mark: Mark) -> Result<(String, String), ScannerError> {
        loop {
            if is_blank(self.peek(0)?) {
                self.skip()?;
                continue;
            }
            let handle = self.scan_tag_handle(true, start_mark.clone())?;
            if !is_blank(self.peek(0)?) {
                return self.err(
                    "while scanning a %TAG directive",
                    start_mark,
                    "did not find expected whitespace",
                );
            }
            while is_blank(self.peek(0)?) {
                self.skip()?;
            }
            let prefix = self.scan_tag_uri(true, true, None, start_mark.clone())?;
            if !is_blankz(self.peek(0)?) {
                return self.err(
                    "while scanning a %TAG directive",
                    start_mark,
                    "did not find expected whitespace or line break",
                );
            }
            return Ok((handle, prefix));
        }
    }

    fn scan_anchor(&mut self, is_alias: bool) -> Result<Token, ScannerError> {
        let mut value = String::new();
        let start_mark = self.mark();
        self.skip()?;
        while is_anchor_char(self.peek(0)?) {
            self.read(&mut value)?;
        }
        let end_mark = self.mark();
        if value.is_empty() {
            return self.err(
                if is_alias { "while scanning an alias" } else { "while scanning an anchor" },
                start_mark,
                "did not find expected anchor name character",
            );
        }
        let data = if is_alias {
            TokenData::Alias { value }
        } else {
            TokenData::Anchor { value }
        };
        Ok(Token::new(data, start_mark, end_mark))
    }

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.mark();
        let (handle, suffix) = if self.peek(1)? == Some('<') {
            self.skip_n(2)?;
            let suffix = self.scan_tag_uri(true, false, None, start_mark.clone())?;
            if self.peek(0)? != Some('>') {
                return self.err("while scanning a tag", start_mark, "did not find the expected '>'");
            }
            self.skip()?;
            (String::new(), suffix)
        } else {
            let mut handle = self.scan_tag_handle(false, start_mark.clone())?;
            let suffix = if handle.starts_with('!') && handle.len() > 1 && handle.ends_with('!') {
                self.scan_tag_uri(false, false, None, start_mark.clone())?
            } else {
                let mut resolved = self.scan_tag_uri(false, false, Some(&handle), start_mark.clone())?;
                handle = String::from("!");
                if resolved.is_empty() {
                    std::mem::swap(&mut handle, &mut resolved);
                }
                resolved
            };
            (handle, suffix)
        };

        if !is_blankz(self.peek(0)?) && !(self.flow_level > 0 && self.peek(0)? == Some(',')) {
            return self.err(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }
        let end_mark = self.mark();
        Ok(Token::new(TokenData::Tag { handle, suffix }, start_mark, end_mark))
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: Mark) -> Result<String, ScannerError> {
        if self.peek(0)? != Some('!') {
            return self.err(
                if directive { "while scanning a tag directive" } else { "while scanning a tag" },
                start_mark,
                "did not find expected '!'",
            );
        }
        let mut handle = String::new();
        self.read(&mut handle)?;
        while is_alpha(self.peek(0)?) {
            self.read(&mut handle)?;
        }
        if self.peek(0)? == Some('!') {
            self.read(&mut handle)?;
        } else if directive && handle != "!" {
            return self.err("while parsing a tag directive", start_mark, "did not find expected '!'");
        }
        Ok(handle)
    }

    fn scan_tag_uri(
        &mut self,
        uri_char: bool,
        directive: bool,
        head: Option<&str>,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let head = head.unwrap_or("");
        let mut length = head.len();
        let mut uri = if length > 1 { String::from(&head[1..]) } else { String::new() };
        loop {
            let Some(ch) = self.peek(0)? else { break };
            let allowed = is_alpha(Some(ch))
                || matches!(ch, ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | '.' | '%' | '!' | '~' | '*' | '\'' | '(' | ')')
                || (uri_char && matches!(ch, ',' | '[' | ']'));
            if !allowed {
                break;
            }
            if ch == '%' {
                self.scan_uri_escapes(directive, start_mark.clone(), &mut uri)?;
            } else {
                self.read(&mut uri)?;
            }
            length += 1;
        }
        if length == 0 {
            return self.err(
                if directive { "while parsing a %TAG directive" } else { "while parsing a tag" },
                start_mark,
                "did not find expected tag URI",
            );
        }
        Ok(uri)
    }

    fn scan_uri_escapes(&mut self, directive: bool, start_mark: Mark, out: &mut String) -> Result<(), ScannerError> {
        let context: &'static str = if directive { "while parsing a %TAG directive" } else { "while parsing a tag" };
        let mut bytes = [0u8; 4];
        let mut width = 0usize;
        let mut collected = 0usize;
        loop {
            let escape_ok = self.peek(0)? == Some('%')
                && self.peek(1)?.is_some_and(|ch| ch.is_ascii_hexdigit())
                && self.peek(2)?.is_some_and(|ch| ch.is_ascii_hexdigit());
            if !escape_ok {
                return self.err(context, start_mark, "did not find URI escaped octet");
            }
            let hi = self.peek(1)?.and_then(|ch| ch.to_digit(16)).unwrap();
            let lo = self.peek(2)?.and_then(|ch| ch.to_digit(16)).unwrap();
            let octet = ((hi << 4) | lo) as u8;
            if collected == 0 {
                width = match octet {
                    0x00..=0x7F => 1,
                    0xC0..=0xDF => 2,
                    0xE0..=0xEF => 3,
                    0xF0..=0xF7 => 4,
                    _ => 0,
                };
                if width == 0 {
                    return self.err(context, start_mark, "found an incorrect leading UTF-8 octet");
                }
            } else if octet & 0xC0 != 0x80 {
                return self.err(context, start_mark, "found an incorrect trailing UTF-8 octet");
            }
            bytes[collected] = octet;
            collected += 1;
            self.skip_n(3)?;
            if collected == width {
                break;
            }
        }
        match std::str::from_utf8(&bytes[..width]) {
            Ok(s) => out.push_str(s),
            Err(_) => return self.err(context, start_mark, "found an invalid UTF-8 octet sequence"),
        }
        Ok(())
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        // -1 = strip, 0 = clip (default), 1 = keep.
        let mut chomping: i32 = 0;
        let mut increment: i32 = 0;
        let mut indent: i32 = 0;
        let mut leading_blank = false;
        let start_mark = self.mark();
        self.skip()?;

        if matches!(self.peek(0)?, Some('+' | '-')) {
            chomping = if self.peek(0)? == Some('+') { 1 } else { -1 };
            self.skip()?;
            if let Some(digit) = self.peek(0)?.and_then(|ch| ch.to_digit(10)) {
                if digit == 0 {
                    return self.err(
                        "while scanning a block scalar",
                        start_mark,
                        "found an indentation indicator equal to 0",
                    );
                }
                increment = digit as i32;
                self.skip()?;
            }
        } else if let Some(digit) = self.peek(0)?.and_then(|ch| ch.to_digit(10)) {
            if digit == 0 {
                return self.err(
                    "while scanning a block scalar",
                    start_mark,
                    "found an indentation indicator equal to 0",
                );
            }
            increment = digit as i32;
            self.skip()?;
            if matches!(self.peek(0)?, Some('+' | '-')) {
                chomping = if self.peek(0)? == Some('+') { 1 } else { -1 };
                self.skip()?;
            }
        }

        while is_blank(self.peek(0)?) {
            self.skip()?;
        }
        if self.check(0, '#')? {
            while !is_breakz(self.peek(0)?) {
                self.skip()?;
            }
        }
        if !is_breakz(self.peek(0)?) {
            return self.err(
                "while scanning a block scalar",
                start_mark,
                "did not find expected comment or line break",
            );
        }
        if is_break(self.peek(0)?) {
            self.skip_line()?;
        }

        let mut end_mark = self.mark();
        if increment != 0 {
            indent = if self.indent >= 0 { self.indent as i32 + increment } else { increment };
        }
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark.clone(), &mut end_mark)?;

        while self.column() as i32 == indent && self.peek(0)?.is_some() {
            let trailing_blank = is_blank(self.peek(0)?);
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
                leading_break.clear();
            } else {
                string.push_str(&leading_break);
                leading_break.clear();
            }
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = is_blank(self.peek(0)?);
            while !is_breakz(self.peek(0)?) {
                self.read(&mut string)?;
            }
            self.read_line(&mut leading_break)?;
            self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark.clone(), &mut end_mark)?;
        }

        if chomping != -1 {
            string.push_str(&leading_break);
        }
        if chomping == 1 {
            string.push_str(&trailing_breaks);
        }

        let style = if literal { ScalarStyle::Literal } else { ScalarStyle::Folded };
        Ok(Token::new(TokenData::Scalar { value: string, style }, start_mark, end_mark))
    }

    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut i32,
        breaks: &mut String,
        start_mark: Mark,
        end_mark: &mut Mark,
    ) -> Result<(), ScannerError> {
        let mut max_indent = 0i32;
        *end_mark = self.mark();
        loop {
            while (*indent == 0 || (self.column() as i32) < *indent) && self.check(0, ' ')? {
                self.skip()?;
            }
            if self.column() as i32 > max_indent {
                max_indent = self.column() as i32;
            }
            if (*indent == 0 || (self.column() as i32) < *indent) && self.check(0, '\t')? {
                return self.err(
                    "while scanning a block scalar",
                    start_mark,
                    "found a tab character where an indentation space is expected",
                );
            }
            if !is_break(self.peek(0)?) {
                break;
            }
            self.read_line(breaks)?;
            *end_mark = self.mark();
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent as i32 + 1).max(1);
        }
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let quote = if single { '\'' } else { '"' };
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let start_mark = self.mark();
        self.skip()?;
        loop {
            if self.column() == 0
                && ((self.check(0, '-')? && self.check(1, '-')? && self.check(2, '-')?)
                    || (self.check(0, '.')? && self.check(1, '.')? && self.check(2, '.')?))
                && is_blankz(self.peek(3)?)
            {
                return self.err(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document indicator",
                );
            }
            if self.peek(0)?.is_none() {
                return self.err(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected end of stream",
                );
            }
            let mut leading_blanks = false;
            while !is_blankz(self.peek(0)?) {
                if single && self.check(0, '\'')? && self.check(1, '\'')? {
                    string.push('\'');
                    self.skip_n(2)?;
                } else if self.peek(0)? == Some(quote) {
                    break;
                } else if !single && self.check(0, '\\')? && is_break(self.peek(1)?) {
                    self.skip()?;
                    self.skip_line()?;
                    leading_blanks = true;
                    break;
                } else if !single && self.check(0, '\\')? {
                    let mut code_length = 0usize;
                    match self.peek(1)? {
                        Some('0') => string.push('\0'),
                        Some('a') => string.push('\x07'),
                        Some('b') => string.push('\x08'),
                        Some('t') | Some('\t') => string.push('\t'),
                        Some('n') => string.push('\n'),
                        Some('v') => string.push('\x0B'),
                        Some('f') => string.push('\x0C'),
                        Some('r') => string.push('\r'),
                        Some('e') => string.push('\x1B'),
                        Some(' ') => string.push(' '),
                        Some('"') => string.push('"'),
                        Some('/') => string.push('/'),
                        Some('\\') => string.push('\\'),
                        Some('N') => string.push('\u{0085}'),
                        Some('_') => string.push('\u{00a0}'),
                        Some('L') => string.push('\u{2028}'),
                        Some('P') => string.push('\u{2029}'),
                        Some('x') => code_length = 2,
                        Some('u') => code_length = 4,
                        Some('U') => code_length = 8,
                        _ => {
                            return self.err(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found unknown escape character",
                            );
                        }
                    }
                    self.skip_n(2)?;
                    if code_length != 0 {
                        let mut value: u32 = 0;
                        for k in 0..code_length {
                            let Some(digit) = self.peek(k)?.and_then(|ch| ch.to_digit(16)) else {
                                return self.err(
                                    "while parsing a quoted scalar",
                                    start_mark,
                                    "did not find expected hexdecimal number",
                                );
                            };
                            value = (value << 4) + digit;
                        }
                        match char::from_u32(value) {
                            Some(ch) => string.push(ch),
                            None => {
                                return self.err(
                                    "while parsing a quoted scalar",
                                    start_mark,
                                    "found invalid Unicode character escape code",
                                );
                            }
                        }
                        self.skip_n(code_length)?;
                    }
                } else {
                    self.read(&mut string)?;
                }
            }
            if self.peek(0)? == Some(quote) {
                break;
            }
            while is_blank(self.peek(0)?) || is_break(self.peek(0)?) {
                if is_blank(self.peek(0)?) {
                    if !leading_blanks {
                        self.read(&mut whitespaces)?;
                    } else {
                        self.skip()?;
                    }
                } else if !leading_blanks {
                    whitespaces.clear();
                    self.read_line(&mut leading_break)?;
                    leading_blanks = true;
                } else {
                    self.read_line(&mut trailing_breaks)?;
                }
            }
            if leading_blanks {
                if leading_break.starts_with('\n') {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                } else {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    leading_break.clear();
                    trailing_breaks.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }
        self.skip()?;
        let end_mark = self.mark();
        let style = if single { ScalarStyle::SingleQuoted } else { ScalarStyle::DoubleQuoted };
        Ok(Token::new(TokenData::Scalar { value: string, style }, start_mark, end_mark))
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        let indent = self.indent + 1;
        let start_mark = self.mark();
        let mut end_mark = start_mark.clone();

        loop {
            if self.column() == 0
                && ((self.check(0, '-')? && self.check(1, '-')? && self.check(2, '-')?)
                    || (self.check(0, '.')? && self.check(1, '.')? && self.check(2, '.')?))
                && is_blankz(self.peek(3)?)
            {
                break;
            }
            if self.check(0, '#')? {
                break;
            }
            while !is_blankz(self.peek(0)?) {
                if self.flow_level != 0
                    && self.check(0, ':')?
                    && matches!(self.peek(1)?, Some(',' | '?' | '[' | ']' | '{' | '}'))
                {
                    return self.err(
                        "while scanning a plain scalar",
                        start_mark,
                        "found unexpected ':'",
                    );
                }
                if (self.check(0, ':')? && is_blankz(self.peek(1)?))
                    || (self.flow_level != 0 && matches!(self.peek(0)?, Some(',' | '[' | ']' | '{' | '}')))
                {
                    break;
                }
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break.starts_with('\n') {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                            leading_break.clear();
                        } else {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            leading_break.clear();
                            trailing_breaks.clear();
                        }
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }
                self.read(&mut string)?;
                end_mark = self.mark();
            }
            if !(is_blank(self.peek(0)?) || is_break(self.peek(0)?)) {
                break;
            }
            while is_blank(self.peek(0)?) || is_break(self.peek(0)?) {
                if is_blank(self.peek(0)?) {
                    if leading_blanks && (self.column() as isize) < indent && self.check(0, '\t')? {
                        return self.err(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                        );
                    }
                    if !leading_blanks {
                        self.read(&mut whitespaces)?;
                    } else {
                        self.skip()?;
                    }
                } else if !leading_blanks {
                    whitespaces.clear();
                    self.read_line(&mut leading_break)?;
                    leading_blanks = true;
                } else {
                    self.read_line(&mut trailing_breaks)?;
                }
            }
            if self.flow_level == 0 && (self.column() as isize) < indent {
                break;
            }
        }

        if leading_blanks {
            self.allow_simple_key = true;
        }

        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reader;
    use pretty_assertions::assert_eq;

    fn tokens(input: &str) -> Vec<TokenData> {
        let mut reader = Reader::new();
        let mut bytes = input.as_bytes();
        reader.set_input_string(&mut bytes);
        let mut scanner = Scanner::new(reader, &Options::default());
        let mut out = Vec::new();
        loop {
            let token = scanner.next_token().unwrap();
            let is_end = matches!(token.data, TokenData::StreamEnd);
            out.push(token.data);
            if is_end {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_a_simple_block_mapping() {
        let toks = tokens("key: value\n");
        assert!(matches!(toks[0], TokenData::StreamStart { .. }));
        assert!(matches!(toks[1], TokenData::BlockMappingStart));
        assert!(matches!(toks[2], TokenData::Key));
        assert!(matches!(&toks[3], TokenData::Scalar { value, .. } if value == "key"));
        assert!(matches!(toks[4], TokenData::Value));
        assert!(matches!(&toks[5], TokenData::Scalar { value, .. } if value == "value"));
        assert!(matches!(toks[6], TokenData::BlockEnd));
        assert!(matches!(toks[7], TokenData::StreamEnd));
    }

    #[test]
    fn scans_a_flow_sequence() {
        let toks = tokens("[1, 2, 3]");
        assert!(matches!(toks[1], TokenData::FlowSequenceStart));
        assert!(matches!(&toks[2], TokenData::Scalar { value, .. } if value == "1"));
        assert!(matches!(toks[3], TokenData::FlowEntry));
        assert!(matches!(&toks[4], TokenData::Scalar { value, .. } if value == "2"));
        assert!(matches!(toks[5], TokenData::FlowEntry));
        assert!(matches!(&toks[6], TokenData::Scalar { value, .. } if value == "3"));
        assert!(matches!(toks[7], TokenData::FlowSequenceEnd));
    }

    #[test]
    fn folds_a_literal_block_scalar_with_clip_chomping() {
        let toks = tokens("|\n  a\n  b\n\nc: 1\n");
        let scalar = toks
            .iter()
            .find(|t| matches!(t, TokenData::Scalar { style: ScalarStyle::Literal, .. }))
            .expect("literal scalar");
        assert!(matches!(scalar, TokenData::Scalar { value, .. } if value == "a\nb\n"));
    }

    #[test]
    fn emits_block_comments_when_enabled() {
        let mut reader = Reader::new();
        let mut bytes = b"# hello\nkey: value\n".as_slice();
        reader.set_input_string(&mut bytes);
        let mut options = Options::default();
        options.parse_comments = true;
        let mut scanner = Scanner::new(reader, &options);
        let mut saw_comment = false;
        loop {
            let token = scanner.next_token().unwrap();
            if let TokenData::Comment { kind, text } = &token.data {
                assert_eq!(*kind, CommentKind::Block);
                assert_eq!(text, "hello");
                saw_comment = true;
            }
            if matches!(token.data, TokenData::StreamEnd) {
                break;
            }
        }
        assert!(saw_comment);
    }

    #[test]
    fn scans_a_block_sequence() {
        let toks = tokens("- a\n- b\n");
        assert!(matches!(toks[1], TokenData::BlockSequenceStart));
        assert!(matches!(toks[2], TokenData::BlockEntry));
        assert!(matches!(&toks[3], TokenData::Scalar { value, .. } if value == "a"));
        assert!(matches!(toks[4], TokenData::BlockEntry));
        assert!(matches!(&toks[5], TokenData::Scalar { value, .. } if value == "b"));
        assert!(matches!(toks[6], TokenData::BlockEnd));
    }

    #[test]
    fn anchor_and_alias_names_allow_non_alphanumeric_characters() {
        let toks = tokens("&a.b foo: *a.b\n");
        assert!(toks.iter().any(|t| matches!(t, TokenData::Anchor { value } if value == "a.b")));
        assert!(toks.iter().any(|t| matches!(t, TokenData::Alias { value } if value == "a.b")));
    }

    #[test]
    fn anchor_name_stops_at_a_flow_indicator() {
        let toks = tokens("[&a,b]");
        assert!(matches!(&toks.iter().find(|t| matches!(t, TokenData::Anchor { .. })).unwrap(),
            TokenData::Anchor { value } if value == "a"));
        assert!(toks.iter().any(|t| matches!(t, TokenData::Scalar { value, .. } if value == "b")));
    }
}
