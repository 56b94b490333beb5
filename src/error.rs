use crate::Mark;

/// Failures raised while pulling code points out of the underlying source.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// A code point fell outside the printable set.
    #[error("{problem}\n  {mark}")]
    NotPrintable {
        problem: &'static str,
        value: u32,
        mark: Mark,
    },
    /// The byte stream did not decode cleanly under the detected encoding.
    #[error("{problem} at byte offset {offset}")]
    Decoding {
        problem: &'static str,
        offset: usize,
    },
    /// The input declared a byte order marker this reader does not recognize.
    #[error("input stream produced an invalid byte order marker")]
    InvalidBom,
    /// The input source is too long to represent with this reader's counters.
    #[error("input is too long")]
    TooLong,
    /// The underlying byte source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures raised while tokenizing.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{context}\n  {context_mark}\n{problem}\n  {problem_mark}")]
    Problem {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// Failures raised while driving the parser's state machine.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("{problem}\n  {mark}")]
    Problem { problem: &'static str, mark: Mark },
    #[error("{context}\n  {context_mark}\n{problem}\n  {mark}")]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

/// Unified error for callers who don't care which stage of the pipeline
/// failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Scanner(#[from] ScannerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
}
