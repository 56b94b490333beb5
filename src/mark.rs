use alloc::sync::Arc;

/// An immutable position in a source, plus a diagnostic snapshot of the
/// code points around it.
///
/// Every [`crate::Token`] and [`crate::Event`] carries a start and end mark.
/// `excerpt`/`caret` are captured once, at construction time, from the
/// reader's small look-behind/look-ahead window; they are not recomputed
/// later, so a `Mark` remains valid even after the reader has moved on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Mark {
    /// Name of the source this position belongs to (a file name, `<string>`,
    /// etc.). Cheap to clone: shared via `Arc`.
    pub name: Arc<str>,
    /// Zero-based code point index from the start of the source.
    pub index: usize,
    /// Zero-based line number.
    pub line: usize,
    /// Zero-based column number (in code points, not bytes).
    pub column: usize,
    /// A short run of source text surrounding this position, for diagnostics.
    pub excerpt: String,
    /// Offset into `excerpt` (in bytes) where the caret should be drawn.
    pub caret: usize,
}

impl Mark {
    pub(crate) fn new(
        name: Arc<str>,
        index: usize,
        line: usize,
        column: usize,
        excerpt: String,
        caret: usize,
    ) -> Self {
        Mark {
            name,
            index,
            line,
            column,
            excerpt,
            caret,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caret_line: String = " ".repeat(self.caret) + "^";
        write!(
            f,
            "in '{}', line {}, column {}:\n    {}\n    {}",
            self.name,
            self.line + 1,
            self.column + 1,
            self.excerpt,
            caret_line
        )
    }
}
