//! Character-class predicates used throughout the reader/scanner. Each
//! accepts `impl Into<Option<char>>` so callers can pass
//! the result of a look-ahead directly, with `None` (end of stream)
//! classified the same way libyaml's sentinel `\0` was: not blank, but a
//! line break terminator (`*z` variants).

pub(crate) fn is_alpha(ch: impl Into<Option<char>>) -> bool {
    let Some(ch) = ch.into() else {
        return false;
    };
    ch.is_ascii_digit() || ch.is_ascii_alphabetic() || ch == '_' || ch == '-'
}

/// Anchor/alias names run until whitespace, a line break, end of input, or a
/// flow indicator (`,[]{}`) — much wider than [`is_alpha`], which is reserved
/// for directive names and tag handles.
pub(crate) fn is_anchor_char(ch: impl Into<Option<char>>) -> bool {
    let Some(ch) = ch.into() else {
        return false;
    };
    !is_blank(Some(ch)) && !is_break(Some(ch)) && !matches!(ch, ',' | '[' | ']' | '{' | '}')
}

pub(crate) fn is_space(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some(' ')
}

pub(crate) fn is_tab(ch: impl Into<Option<char>>) -> bool {
    ch.into() == Some('\t')
}

pub(crate) fn is_blank(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_space(ch) || is_tab(ch)
}

pub(crate) fn is_blankz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    is_blank(ch) || is_breakz(ch)
}

pub(crate) fn is_break(ch: impl Into<Option<char>>) -> bool {
    matches!(
        ch.into(),
        Some('\r' | '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}')
    )
}

pub(crate) fn is_breakz(ch: impl Into<Option<char>>) -> bool {
    let ch = ch.into();
    ch.is_none() || is_break(ch)
}
