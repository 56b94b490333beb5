use alloc::collections::VecDeque;
use alloc::sync::Arc;

use crate::{Encoding, Mark, ReaderError};

/// How many trailing raw bytes to pull in per refill.
const INPUT_RAW_BUFFER_SIZE: usize = 16384;
/// Code points of look-behind/look-ahead kept around for [`Mark`] excerpts.
const EXCERPT_RADIUS: usize = 40;
/// Width of the window a pending simple key is allowed to stay possible
/// across.
pub(crate) const SIMPLE_KEY_WINDOW: usize = 1024;

const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];
const BOM_UTF16LE: [u8; 2] = [0xFF, 0xFE];
const BOM_UTF16BE: [u8; 2] = [0xFE, 0xFF];

enum Input<'r> {
    String { data: &'r [u8], pos: usize },
    Read(&'r mut dyn std::io::BufRead),
    None,
}

/// Pulls a validated stream of Unicode scalar values out of a byte source.
///
/// The reader owns encoding detection, UTF-8/UTF-16 decoding, and printable
/// validation. [`crate::Scanner`] consumes its `window` to
/// tokenize; nothing upstream of `Reader` deals in bytes.
pub struct Reader<'r> {
    name: Arc<str>,
    input: Input<'r>,
    raw_buffer: VecDeque<u8>,
    eof: bool,
    pub(crate) encoding: Encoding,
    /// Code points decoded but not yet consumed by the scanner.
    pub(crate) window: VecDeque<char>,
    /// Small ring of already-consumed code points, kept for excerpts.
    history: VecDeque<char>,
    /// Code point offset from the start of the stream.
    index: usize,
    line: usize,
    column: usize,
}

impl<'r> Default for Reader<'r> {
    fn default() -> Self {
        Reader::new()
    }
}

impl<'r> Reader<'r> {
    pub fn new() -> Reader<'r> {
        Reader {
            name: Arc::from("<unknown>"),
            input: Input::None,
            raw_buffer: VecDeque::new(),
            eof: false,
            encoding: Encoding::Any,
            window: VecDeque::new(),
            history: VecDeque::new(),
            index: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn set_name(&mut self, name: impl Into<Arc<str>>) {
        self.name = name.into();
    }

    pub fn set_input_string(&mut self, input: &'r mut &[u8]) {
        self.input = Input::String {
            data: input,
            pos: 0,
        };
        self.eof = false;
        self.name = Arc::from("<string>");
    }

    pub fn set_input(&mut self, input: &'r mut dyn std::io::BufRead) {
        self.input = Input::Read(input);
        self.eof = false;
        self.name = Arc::from("<stream>");
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    /// Zero-based code point index, line and column of the next unread char.
    pub(crate) fn position(&self) -> (usize, usize, usize) {
        (self.index, self.line, self.column)
    }

    /// Build a [`Mark`] for the reader's current position.
    pub(crate) fn mark(&self) -> Mark {
        self.mark_at(self.index, self.line, self.column)
    }

    /// Mark for a STREAM-END token: if the stream didn't end exactly at a
    /// line start, report it as if it did.
    pub(crate) fn stream_end_mark(&self) -> Mark {
        let (index, line, column) = self.position();
        if column == 0 {
            self.mark()
        } else {
            self.mark_at(index, line + 1, 0)
        }
    }

    pub(crate) fn mark_at(&self, index: usize, line: usize, column: usize) -> Mark {
        let behind = self.history.len().min(EXCERPT_RADIUS);
        let ahead = self.window.len().min(EXCERPT_RADIUS);
        let mut excerpt = String::new();
        for &ch in self.history.iter().skip(self.history.len() - behind) {
            if ch == '\n' || ch == '\r' {
                excerpt.clear();
                continue;
            }
            excerpt.push(ch);
        }
        let caret = excerpt.len();
        for &ch in self.window.iter().take(ahead) {
            if ch == '\n' || ch == '\r' {
                break;
            }
            excerpt.push(ch);
        }
        Mark::new(self.name.clone(), index, line, column, excerpt, caret)
    }

    fn fill_raw(&mut self) -> Result<(), ReaderError> {
        if self.eof || self.raw_buffer.len() >= INPUT_RAW_BUFFER_SIZE {
            return Ok(());
        }
        let mut buf = [0u8; INPUT_RAW_BUFFER_SIZE];
        let read = match &mut self.input {
            Input::String { data, pos } => {
                let remaining = &data[*pos..];
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                *pos += n;
                n
            }
            Input::Read(r) => r.read(&mut buf)?,
            Input::None => 0,
        };
        if read == 0 {
            self.eof = true;
        } else {
            self.raw_buffer.extend(buf[..read].iter().copied());
            log::trace!(
                "reader: pulled {read} raw bytes ({} buffered)",
                self.raw_buffer.len()
            );
        }
        Ok(())
    }

    fn determine_encoding(&mut self) -> Result<(), ReaderError> {
        while self.raw_buffer.len() < 3 && !self.eof {
            self.fill_raw()?;
        }
        let (head, tail) = self.raw_buffer.as_slices();
        let mut first3 = [0u8; 3];
        let mut n = 0;
        for &b in head.iter().chain(tail.iter()).take(3) {
            first3[n] = b;
            n += 1;
        }
        let first3 = &first3[..n];
        if first3.starts_with(&BOM_UTF16LE) && !first3.starts_with(&BOM_UTF8[..2]) {
            self.encoding = Encoding::Utf16Le;
            self.raw_buffer.drain(..2);
        } else if first3.starts_with(&BOM_UTF16BE) {
            self.encoding = Encoding::Utf16Be;
            self.raw_buffer.drain(..2);
        } else if first3.starts_with(&BOM_UTF8) {
            self.encoding = Encoding::Utf8;
            self.raw_buffer.drain(..3);
        } else {
            self.encoding = Encoding::Utf8;
        }
        Ok(())
    }

    fn decode_utf8(raw: &mut VecDeque<u8>) -> Option<Result<char, ReaderError>> {
        let &lead = raw.front()?;
        let width = match lead {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => {
                raw.pop_front();
                return Some(Err(ReaderError::Decoding {
                    problem: "invalid leading UTF-8 octet",
                    offset: 0,
                }));
            }
        };
        if raw.len() < width {
            return None;
        }
        let mut bytes = [0u8; 4];
        for (i, b) in raw.iter().take(width).enumerate() {
            bytes[i] = *b;
        }
        let value = match std::str::from_utf8(&bytes[..width]) {
            Ok(s) => s.chars().next().unwrap(),
            Err(_) => {
                for _ in 0..width {
                    raw.pop_front();
                }
                return Some(Err(ReaderError::Decoding {
                    problem: "invalid UTF-8 octet sequence",
                    offset: 0,
                }));
            }
        };
        for _ in 0..width {
            raw.pop_front();
        }
        Some(Ok(value))
    }

    fn decode_utf16<const BIG_ENDIAN: bool>(
        raw: &mut VecDeque<u8>,
    ) -> Option<Result<char, ReaderError>> {
        if raw.len() < 2 {
            return None;
        }
        let unit = |b0: u8, b1: u8| -> u16 {
            if BIG_ENDIAN {
                u16::from_be_bytes([b0, b1])
            } else {
                u16::from_le_bytes([b0, b1])
            }
        };
        let b0 = raw[0];
        let b1 = raw[1];
        let value = unit(b0, b1);
        if (0xDC00..=0xDFFF).contains(&value) {
            raw.drain(..2);
            return Some(Err(ReaderError::Decoding {
                problem: "unexpected low surrogate",
                offset: 0,
            }));
        }
        if (0xD800..=0xDBFF).contains(&value) {
            if raw.len() < 4 {
                return None;
            }
            let value2 = unit(raw[2], raw[3]);
            if !(0xDC00..=0xDFFF).contains(&value2) {
                raw.drain(..2);
                return Some(Err(ReaderError::Decoding {
                    problem: "expected low surrogate",
                    offset: 0,
                }));
            }
            let scalar = 0x10000u32 + ((value as u32 & 0x3FF) << 10) + (value2 as u32 & 0x3FF);
            raw.drain(..4);
            return match char::from_u32(scalar) {
                Some(ch) => Some(Ok(ch)),
                None => Some(Err(ReaderError::Decoding {
                    problem: "invalid Unicode scalar value",
                    offset: 0,
                })),
            };
        }
        raw.drain(..2);
        match char::from_u32(value as u32) {
            Some(ch) => Some(Ok(ch)),
            None => Some(Err(ReaderError::Decoding {
                problem: "invalid Unicode scalar value",
                offset: 0,
            })),
        }
    }

    fn is_printable(ch: char) -> bool {
        matches!(
            ch,
            '\u{09}'
                | '\u{0A}'
                | '\u{0D}'
                | '\u{20}'..='\u{7E}'
                | '\u{85}'
                | '\u{A0}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}'
        )
    }

    fn push_char(&mut self, ch: char) -> Result<(), ReaderError> {
        if !Self::is_printable(ch) {
            return Err(ReaderError::NotPrintable {
                problem: "special characters are not allowed",
                value: ch as u32,
                mark: self.mark(),
            });
        }
        self.window.push_back(ch);
        Ok(())
    }

    /// Make sure at least `length` code points are available in `window`,
    /// refilling and decoding from the raw byte source as needed.
    pub(crate) fn ensure(&mut self, length: usize) -> Result<(), ReaderError> {
        if self.window.len() >= length {
            return Ok(());
        }
        if matches!(self.encoding, Encoding::Any) {
            self.determine_encoding()?;
        }
        while self.window.len() < length {
            self.fill_raw()?;
            let decoded = match self.encoding {
                Encoding::Utf8 | Encoding::Any => Self::decode_utf8(&mut self.raw_buffer),
                Encoding::Utf16Le => Self::decode_utf16::<false>(&mut self.raw_buffer),
                Encoding::Utf16Be => Self::decode_utf16::<true>(&mut self.raw_buffer),
            };
            match decoded {
                Some(Ok(ch)) => self.push_char(ch)?,
                Some(Err(e)) => return Err(e),
                None => {
                    if self.eof {
                        break;
                    }
                }
            }
            if self.index >= usize::MAX / 2 {
                return Err(ReaderError::TooLong);
            }
        }
        Ok(())
    }

    pub(crate) fn peek(&mut self, offset: usize) -> Result<Option<char>, ReaderError> {
        self.ensure(offset + 1)?;
        Ok(self.window.get(offset).copied())
    }

    /// Advance past one code point, updating index/line/column. Treats any
    /// break character as a line terminator; a CRLF pair counts as one.
    pub(crate) fn skip(&mut self) -> Result<(), ReaderError> {
        self.ensure(2)?;
        let Some(ch) = self.window.pop_front() else {
            return Ok(());
        };
        let is_bom = ch == '\u{feff}';
        if crate::macros::is_break(Some(ch)) {
            if ch == '\r' && self.window.front().copied() == Some('\n') {
                self.window.pop_front();
                self.history.push_back('\n');
                self.index += 2;
            } else {
                self.history.push_back(ch);
                self.index += 1;
            }
            self.line += 1;
            self.column = 0;
        } else {
            self.history.push_back(ch);
            self.index += 1;
            if !is_bom {
                self.column += 1;
            }
        }
        while self.history.len() > EXCERPT_RADIUS * 2 {
            self.history.pop_front();
        }
        Ok(())
    }

    pub(crate) fn skip_n(&mut self, n: usize) -> Result<(), ReaderError> {
        for _ in 0..n {
            self.skip()?;
        }
        Ok(())
    }

    /// Append the current code point verbatim to `out`, then advance.
    pub(crate) fn read(&mut self, out: &mut String) -> Result<(), ReaderError> {
        self.ensure(1)?;
        if let Some(&ch) = self.window.front() {
            out.push(ch);
        }
        self.skip()
    }

    /// Advance past one line break without recording it anywhere. Used when
    /// comments are disabled and a blank or comment-only line is discarded.
    /// `skip` already folds a CRLF pair into a single logical break.
    pub(crate) fn skip_line(&mut self) -> Result<(), ReaderError> {
        self.skip()
    }

    /// Append the current code point to `out` as a line break, normalizing
    /// CR/LF/CRLF/NEL to `\n` (U+2028/U+2029 are preserved verbatim).
    pub(crate) fn read_line(&mut self, out: &mut String) -> Result<(), ReaderError> {
        self.ensure(2)?;
        let ch = self.window.front().copied();
        match ch {
            Some('\r') if self.window.get(1).copied() == Some('\n') => {
                out.push('\n');
                self.skip_n(2)
            }
            Some('\r') | Some('\n') | Some('\u{0085}') => {
                out.push('\n');
                self.skip()
            }
            Some(c @ ('\u{2028}' | '\u{2029}')) => {
                out.push(c);
                self.skip()
            }
            _ => self.skip(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn window_of(mut input: &[u8]) -> (Reader<'_>, ()) {
        let mut reader = Reader::new();
        reader.set_input_string(&mut input);
        (reader, ())
    }

    #[test]
    fn decodes_plain_ascii() {
        let (mut reader, _) = window_of(b"abc");
        reader.ensure(3).unwrap();
        let s: String = reader.window.iter().collect();
        assert_eq!(s, "abc");
    }

    #[test]
    fn strips_utf8_bom() {
        let mut data: &[u8] = b"\xEF\xBB\xBFhi";
        let mut reader = Reader::new();
        reader.set_input_string(&mut data);
        reader.ensure(2).unwrap();
        let s: String = reader.window.iter().collect();
        assert_eq!(s, "hi");
    }

    #[test]
    fn rejects_non_printable_control_character() {
        let mut data: &[u8] = b"\x01";
        let mut reader = Reader::new();
        reader.set_input_string(&mut data);
        let err = reader.ensure(1).unwrap_err();
        assert!(matches!(err, ReaderError::NotPrintable { .. }));
    }

    #[test]
    fn crlf_counts_as_one_line_break() {
        let mut data: &[u8] = b"a\r\nb";
        let mut reader = Reader::new();
        reader.set_input_string(&mut data);
        reader.skip().unwrap();
        let before = reader.position();
        reader.skip().unwrap();
        let after = reader.position();
        assert_eq!(before.1, 0);
        assert_eq!(after.1, 1);
        assert_eq!(after.2, 0);
    }

    #[test]
    fn decodes_utf16_le_through_the_read_backed_path() {
        // BOM, 'a', then the surrogate pair for U+1F600.
        let data: &[u8] = &[0xFF, 0xFE, 0x61, 0x00, 0x3D, 0xD8, 0x00, 0xDE];
        let mut cursor = std::io::Cursor::new(data);
        let mut reader = Reader::new();
        reader.set_input(&mut cursor);
        reader.ensure(2).unwrap();
        let s: String = reader.window.iter().collect();
        assert_eq!(s, "a\u{1F600}");
        assert_eq!(reader.encoding, Encoding::Utf16Le);
    }

    #[test]
    fn decodes_utf16_be_through_the_read_backed_path() {
        // BOM, 'a', then the surrogate pair for U+1F600.
        let data: &[u8] = &[0xFE, 0xFF, 0x00, 0x61, 0xD8, 0x3D, 0xDE, 0x00];
        let mut cursor = std::io::Cursor::new(data);
        let mut reader = Reader::new();
        reader.set_input(&mut cursor);
        reader.ensure(2).unwrap();
        let s: String = reader.window.iter().collect();
        assert_eq!(s, "a\u{1F600}");
        assert_eq!(reader.encoding, Encoding::Utf16Be);
    }

    #[test]
    fn rejects_an_unexpected_low_surrogate_in_utf16() {
        // BOM followed by a lone low surrogate code unit (0xDC00).
        let data: &[u8] = &[0xFF, 0xFE, 0x00, 0xDC];
        let mut cursor = std::io::Cursor::new(data);
        let mut reader = Reader::new();
        reader.set_input(&mut cursor);
        let err = reader.ensure(1).unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Decoding {
                problem: "unexpected low surrogate",
                ..
            }
        ));
    }
}
