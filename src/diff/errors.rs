use thiserror::Error;

/// The diff text could not be turned into hunks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed patch: no hunk header found")]
    NoHunks,

    #[error("malformed patch: invalid hunk header: {header}")]
    InvalidHunkHeader { header: String },

    #[error("malformed patch: unexpected line {line_number} in hunk body: {line:?}")]
    UnexpectedLine { line_number: usize, line: String },

    #[error(
        "malformed patch: hunk starting at original line {start} overlaps or precedes the previous hunk (which ends at line {previous_end})"
    )]
    OutOfOrderHunk { start: usize, previous_end: usize },
}

/// The hunks disagree with the content they are being applied to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("hunk deletion does not match original content at line {line}: expected {expected:?}, found {found:?}")]
    DeleteMismatch {
        line: usize,
        expected: String,
        found: Option<String>,
    },

    #[error("patch cursor exceeded original content length ({cursor} > {len})")]
    CursorOverrun { cursor: usize, len: usize },

    #[error("hunk starts at line {start} but lines up to {cursor} were already consumed")]
    HunkBehindCursor { start: usize, cursor: usize },
}
