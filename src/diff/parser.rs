//! Unified diff parser.
//!
//! Turns diff text into an ordered list of [`Hunk`]s. Only hunk bodies carry
//! meaning here; file headers (`---`/`+++`), `diff ...`/`index ...` metadata
//! and any preamble before the first hunk are skipped.
//!
//! The parser is a pure function and is shared by the validator and the
//! applicator, so both stages always see the same structure.

use crate::diff::errors::ParseError;

/// A single line operation inside a hunk, in diff order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOp {
    /// Unchanged line (` ` prefix)
    Context(String),
    /// Line removed from the original (`-` prefix)
    Delete(String),
    /// Line added to the new content (`+` prefix)
    Insert(String),
}

impl LineOp {
    /// Line text with the diff prefix stripped.
    pub fn text(&self) -> &str {
        match self {
            LineOp::Context(text) | LineOp::Delete(text) | LineOp::Insert(text) => text,
        }
    }

    /// Whether this operation consumes a line of the original content.
    pub fn consumes_original(&self) -> bool {
        matches!(self, LineOp::Context(_) | LineOp::Delete(_))
    }
}

/// One anchored block of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 0-based line offset into the original content
    pub original_start: usize,
    /// Operations in the literal order they appear in the diff
    pub operations: Vec<LineOp>,
}

impl Hunk {
    pub fn new(original_start: usize) -> Self {
        Self {
            original_start,
            operations: Vec::new(),
        }
    }

    /// Number of original lines this hunk spans (context + deletions).
    pub fn original_len(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.consumes_original())
            .count()
    }

    /// Number of lines this hunk produces (context + insertions).
    pub fn new_len(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| !matches!(op, LineOp::Delete(_)))
            .count()
    }

    /// Exclusive end of the original span.
    pub fn original_end(&self) -> usize {
        self.original_start + self.original_len()
    }

    pub fn context_lines(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().filter_map(|op| match op {
            LineOp::Context(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Parsed `@@ -start[,count] +start[,count] @@` header.
///
/// Counts are informational: the operation list is the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    /// 1-based start line in the original, as written
    pub original_start: usize,
    pub original_count: Option<usize>,
    pub new_start: usize,
    pub new_count: Option<usize>,
}

impl HunkHeader {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidHunkHeader {
            header: line.to_string(),
        };

        let rest = line.strip_prefix("@@ ").ok_or_else(invalid)?;
        // Anything after the closing `@@` is a section heading and is ignored.
        let (ranges, _) = rest.split_once(" @@").ok_or_else(invalid)?;

        let mut parts = ranges.split_whitespace();
        let old = parts
            .next()
            .and_then(|p| p.strip_prefix('-'))
            .ok_or_else(invalid)?;
        let new = parts
            .next()
            .and_then(|p| p.strip_prefix('+'))
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let (original_start, original_count) = parse_range(old).ok_or_else(invalid)?;
        let (new_start, new_count) = parse_range(new).ok_or_else(invalid)?;

        Ok(Self {
            original_start,
            original_count,
            new_start,
            new_count,
        })
    }

    /// 0-based offset into the original content: `max(start - 1, 0)`,
    /// whatever the declared count.
    pub fn original_offset(&self) -> usize {
        self.original_start.saturating_sub(1)
    }
}

fn parse_range(range: &str) -> Option<(usize, Option<usize>)> {
    match range.split_once(',') {
        Some((start, count)) => Some((parse_number(start)?, Some(parse_number(count)?))),
        None => Some((parse_number(range)?, None)),
    }
}

fn parse_number(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parse unified diff text into hunks.
///
/// Fails with [`ParseError::NoHunks`] if no `@@` header exists, and with
/// [`ParseError::OutOfOrderHunk`] if a hunk starts before the previous one
/// ends.
pub fn parse(diff: &str) -> Result<Vec<Hunk>, ParseError> {
    let lines: Vec<&str> = diff.lines().collect();
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut current: Option<(Hunk, HunkHeader)> = None;

    for (idx, line) in lines.iter().enumerate() {
        if line.starts_with("@@") {
            if let Some((hunk, _)) = current.take() {
                push_hunk(&mut hunks, hunk)?;
            }
            let header = HunkHeader::parse(line)?;
            current = Some((Hunk::new(header.original_offset()), header));
            continue;
        }

        let Some((hunk, header)) = current.as_mut() else {
            // Top level: file headers, metadata, preamble.
            continue;
        };

        if starts_file_section(&lines, idx, hunk, header) {
            if let Some((hunk, _)) = current.take() {
                push_hunk(&mut hunks, hunk)?;
            }
            continue;
        }

        if line.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }

        if line.is_empty() {
            // Blank separator after a complete hunk. Inside an unfinished
            // hunk there is no way to tell which original line it stands for.
            if header_satisfied(hunk, header) {
                continue;
            }
            return Err(ParseError::UnexpectedLine {
                line_number: idx + 1,
                line: String::new(),
            });
        }

        let op = match line.chars().next() {
            Some(' ') => LineOp::Context(line[1..].to_string()),
            Some('-') => LineOp::Delete(line[1..].to_string()),
            Some('+') => LineOp::Insert(line[1..].to_string()),
            _ => {
                return Err(ParseError::UnexpectedLine {
                    line_number: idx + 1,
                    line: line.to_string(),
                })
            }
        };
        hunk.operations.push(op);
    }

    if let Some((hunk, _)) = current.take() {
        push_hunk(&mut hunks, hunk)?;
    }

    if hunks.is_empty() {
        return Err(ParseError::NoHunks);
    }

    Ok(hunks)
}

/// A line inside a hunk body only ends the hunk if it opens a new file
/// section: `diff ...` metadata, or a `--- `/`+++ ` pair once the hunk
/// holds at least as many lines as its header declares. Before that point a
/// `---`/`+++` line is body content (a deleted `-- x` or inserted `++ y`).
fn starts_file_section(lines: &[&str], idx: usize, hunk: &Hunk, header: &HunkHeader) -> bool {
    let line = lines[idx];
    if line.starts_with("diff ") {
        return true;
    }
    if !line.starts_with("--- ") {
        return false;
    }
    let next_is_new_header = lines
        .get(idx + 1)
        .is_some_and(|next| next.starts_with("+++ "));
    next_is_new_header && header_satisfied(hunk, header)
}

fn header_satisfied(hunk: &Hunk, header: &HunkHeader) -> bool {
    // An omitted count means one line.
    hunk.original_len() >= header.original_count.unwrap_or(1)
        && hunk.new_len() >= header.new_count.unwrap_or(1)
}

fn push_hunk(hunks: &mut Vec<Hunk>, hunk: Hunk) -> Result<(), ParseError> {
    if let Some(previous) = hunks.last() {
        let previous_end = previous.original_end();
        if hunk.original_start < previous_end {
            return Err(ParseError::OutOfOrderHunk {
                start: hunk.original_start + 1,
                previous_end,
            });
        }
    }
    hunks.push(hunk);
    Ok(())
}
