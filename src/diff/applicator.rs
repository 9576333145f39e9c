//! Hunk application.
//!
//! Reconstructs new content from an [`OriginalContent`] snapshot and parsed
//! hunks in a single forward pass. Context lines are emitted from the hunk
//! itself; only deletions are compared against the original, which makes
//! this the positional check that complements the validator's
//! membership-only context rule.

use crate::content::OriginalContent;
use crate::diff::errors::ApplyError;
use crate::diff::parser::{Hunk, LineOp};

/// Apply hunks to the original content, returning the new text.
///
/// The result ends with a newline iff the original did.
pub fn apply(original: &OriginalContent, hunks: &[Hunk]) -> Result<String, ApplyError> {
    let source = original.lines();
    let mut output: Vec<&str> = Vec::with_capacity(source.len());
    let mut cursor = 0;

    for hunk in hunks {
        if hunk.original_start < cursor {
            return Err(ApplyError::HunkBehindCursor {
                start: hunk.original_start + 1,
                cursor,
            });
        }
        if hunk.original_start > source.len() {
            return Err(ApplyError::CursorOverrun {
                cursor: hunk.original_start,
                len: source.len(),
            });
        }

        // Unmodified region before this hunk
        output.extend(source[cursor..hunk.original_start].iter().map(String::as_str));
        cursor = hunk.original_start;

        for op in &hunk.operations {
            match op {
                LineOp::Context(text) => {
                    output.push(text);
                    cursor += 1;
                }
                LineOp::Delete(expected) => match source.get(cursor) {
                    Some(found) if found == expected => cursor += 1,
                    found => {
                        return Err(ApplyError::DeleteMismatch {
                            line: cursor + 1,
                            expected: expected.clone(),
                            found: found.cloned(),
                        })
                    }
                },
                LineOp::Insert(text) => output.push(text),
            }
        }

        if cursor > source.len() {
            return Err(ApplyError::CursorOverrun {
                cursor,
                len: source.len(),
            });
        }
    }

    output.extend(source[cursor..].iter().map(String::as_str));

    let mut new_content = output.join("\n");
    if original.has_trailing_newline() {
        new_content.push('\n');
    }
    Ok(new_content)
}
