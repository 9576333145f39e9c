//! Policy validation for generated diffs.
//!
//! Rules run in a fixed order and the first violation wins. The order is
//! part of the observable contract: callers only ever see one message for a
//! diff that breaks several rules.
//!
//! Most rules inspect the raw diff text line by line. Only the context rule
//! needs hunk structure, which it gets from the shared [`parse`] function.

use crate::config::Policy;
use crate::content::OriginalContent;
use crate::diff::errors::ParseError;
use crate::diff::parser::parse;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static FILE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]{3} (.+)$").expect("file header pattern is valid"));

/// First policy rule a diff violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("Empty diff returned by generator")]
    EmptyDiff,

    #[error("Diff is not unified diff format (no @@ hunk marker)")]
    NotUnifiedDiff,

    #[error("Diff must start with file headers (---)")]
    MissingDiffPrefix,

    #[error("Diff must contain both headers (original and new file)")]
    MissingHeaders,

    #[error("Diff refers to unexpected file path (expected {expected})")]
    UnexpectedFilePath { expected: String },

    #[error("Diff modifies multiple files, which is not allowed ({})", files.join(", "))]
    MultipleFiles { files: Vec<String> },

    #[error("File extension not allowed by codex: {path}")]
    ExtensionNotAllowed { path: String },

    #[error("Diff attempts to insert banned content: {banned}")]
    BannedContent { banned: String },

    #[error("Diff removes lines, deletions not allowed by codex")]
    DeletionsForbidden,

    #[error("An inserted line exceeds maximum length ({length} > {max})")]
    LineTooLong { length: usize, max: usize },

    #[error("Diff context lines do not match original, potential corruption ({line:?})")]
    ContextMismatch { line: String },

    #[error("Diff hunks could not be parsed for context check: {0}")]
    MalformedHunks(ParseError),
}

/// Validate `diff` against `policy` for a change to `target`.
///
/// Pure: never touches the filesystem and never mutates its inputs.
pub fn validate(
    diff: &str,
    original: &OriginalContent,
    policy: &Policy,
    target: &Path,
) -> Result<(), ValidationIssue> {
    let target = target.to_string_lossy();
    let lines: Vec<&str> = diff.lines().collect();

    check_not_empty(diff)?;
    check_unified(diff, policy)?;
    check_prefix(diff, policy)?;
    check_headers(&lines, &target)?;
    check_single_file(&lines, policy)?;
    check_extension(&target, policy)?;
    check_banned_insertions(&lines, policy)?;
    check_deletions(&lines, policy)?;
    check_line_lengths(&lines, policy)?;
    check_context(diff, original, policy)?;

    debug!(file = %target, "diff passed all codex rules");
    Ok(())
}

fn check_not_empty(diff: &str) -> Result<(), ValidationIssue> {
    if diff.trim().is_empty() {
        return Err(ValidationIssue::EmptyDiff);
    }
    Ok(())
}

fn check_unified(diff: &str, policy: &Policy) -> Result<(), ValidationIssue> {
    if policy.require_unified_diff && !diff.contains("@@") {
        return Err(ValidationIssue::NotUnifiedDiff);
    }
    Ok(())
}

fn check_prefix(diff: &str, policy: &Policy) -> Result<(), ValidationIssue> {
    if policy.enforce_diff_prefix && !diff.trim().starts_with("---") {
        return Err(ValidationIssue::MissingDiffPrefix);
    }
    Ok(())
}

/// The first two `---`/`+++` lines are taken as the original/new headers.
/// The target only has to appear somewhere in each, so `a/`/`b/` prefixes
/// and timestamps are tolerated.
fn check_headers(lines: &[&str], target: &str) -> Result<(), ValidationIssue> {
    let headers: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.starts_with("---") || line.starts_with("+++"))
        .take(2)
        .collect();

    let [original_header, new_header] = headers.as_slice() else {
        return Err(ValidationIssue::MissingHeaders);
    };

    if !original_header.contains(target) || !new_header.contains(target) {
        return Err(ValidationIssue::UnexpectedFilePath {
            expected: target.to_string(),
        });
    }
    debug!("file headers name the target");
    Ok(())
}

fn check_single_file(lines: &[&str], policy: &Policy) -> Result<(), ValidationIssue> {
    if policy.allow_multiple_files {
        return Ok(());
    }

    let files: BTreeSet<&str> = lines
        .iter()
        .filter_map(|line| FILE_HEADER.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    if files.len() != 1 {
        return Err(ValidationIssue::MultipleFiles {
            files: files.into_iter().map(str::to_string).collect(),
        });
    }
    Ok(())
}

fn check_extension(target: &str, policy: &Policy) -> Result<(), ValidationIssue> {
    if !policy
        .allowed_extensions
        .iter()
        .any(|ext| target.ends_with(ext.as_str()))
    {
        return Err(ValidationIssue::ExtensionNotAllowed {
            path: target.to_string(),
        });
    }
    Ok(())
}

fn inserted_lines<'a>(lines: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
    lines
        .iter()
        .filter(|line| line.starts_with('+') && !line.starts_with("+++"))
        .map(|line| &line[1..])
}

fn check_banned_insertions(lines: &[&str], policy: &Policy) -> Result<(), ValidationIssue> {
    for banned in &policy.banned_insertions {
        if inserted_lines(lines).any(|line| line.contains(banned.as_str())) {
            return Err(ValidationIssue::BannedContent {
                banned: banned.clone(),
            });
        }
    }
    Ok(())
}

fn check_deletions(lines: &[&str], policy: &Policy) -> Result<(), ValidationIssue> {
    if policy.forbid_deletions
        && lines
            .iter()
            .any(|line| line.starts_with('-') && !line.starts_with("---"))
    {
        return Err(ValidationIssue::DeletionsForbidden);
    }
    Ok(())
}

fn check_line_lengths(lines: &[&str], policy: &Policy) -> Result<(), ValidationIssue> {
    let max = policy.max_line_length;
    if max == 0 {
        return Ok(());
    }
    for line in inserted_lines(lines) {
        let length = line.chars().count();
        if length > max {
            return Err(ValidationIssue::LineTooLong { length, max });
        }
    }
    Ok(())
}

/// Every context line must exist somewhere in the original. This is a
/// membership check, not a positional one; the applicator's deletion check
/// covers position.
fn check_context(
    diff: &str,
    original: &OriginalContent,
    policy: &Policy,
) -> Result<(), ValidationIssue> {
    if policy.minimum_context_lines == 0 {
        return Ok(());
    }

    let hunks = parse(diff).map_err(ValidationIssue::MalformedHunks)?;
    let known = original.line_set();
    for hunk in &hunks {
        if let Some(line) = hunk.context_lines().find(|line| !known.contains(line)) {
            return Err(ValidationIssue::ContextMismatch {
                line: line.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy {
            allowed_extensions: vec![".txt".to_string()],
            max_line_length: 120,
            minimum_context_lines: 1,
            banned_insertions: vec!["DROP TABLE".to_string()],
            ..Policy::default()
        }
    }

    fn check(diff: &str, original: &str, policy: &Policy) -> Result<(), ValidationIssue> {
        validate(
            diff,
            &OriginalContent::new(original),
            policy,
            Path::new("data.txt"),
        )
    }

    #[test]
    fn test_accepts_valid_diff() {
        let diff = "--- data.txt\n+++ data.txt\n@@ -1,2 +1,3 @@\n hello\n+there\n world\n";
        assert_eq!(check(diff, "hello\nworld\n", &policy()), Ok(()));
    }

    #[test]
    fn test_rejects_empty_diff() {
        let err = check("  \n\t\n", "hello\n", &policy()).unwrap_err();
        assert_eq!(err, ValidationIssue::EmptyDiff);
        assert!(err.to_string().contains("Empty diff"));
    }

    #[test]
    fn test_rejects_missing_hunk_marker() {
        let err = check("--- data.txt\n+++ data.txt\n+hi\n", "hello\n", &policy()).unwrap_err();
        assert_eq!(err, ValidationIssue::NotUnifiedDiff);
        assert!(err.to_string().contains("not unified diff format"));
    }

    #[test]
    fn test_rejects_missing_prefix() {
        let diff = "+++ data.txt\n--- data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        let err = check(diff, "hello\n", &policy()).unwrap_err();
        assert_eq!(err, ValidationIssue::MissingDiffPrefix);
        assert!(err.to_string().contains("must start with file headers"));
    }

    #[test]
    fn test_prefix_rule_trims_leading_whitespace() {
        let diff = "\n  --- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        // Passes the prefix rule; the header rule still sees "  --- data.txt"
        // as a non-header line and fails on the header count.
        let err = check(diff, "hello\n", &policy()).unwrap_err();
        assert_eq!(err, ValidationIssue::MissingHeaders);
    }

    #[test]
    fn test_rejects_single_header() {
        let policy = Policy {
            enforce_diff_prefix: false,
            ..policy()
        };
        let diff = "+++ data.txt\n@@ -1 +1 @@\n hello\n";
        let err = check(diff, "hello\n", &policy).unwrap_err();
        assert_eq!(err, ValidationIssue::MissingHeaders);
        assert!(err.to_string().contains("must contain both headers"));
    }

    #[test]
    fn test_rejects_wrong_file() {
        let diff = "--- wrong.txt\n+++ wrong.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        let err = check(diff, "hello\n", &policy()).unwrap_err();
        assert!(matches!(err, ValidationIssue::UnexpectedFilePath { .. }));
        assert!(err.to_string().contains("unexpected file path"));
    }

    #[test]
    fn test_header_match_is_substring() {
        let policy = Policy {
            allow_multiple_files: true,
            ..policy()
        };
        let diff = "--- a/data.txt\t2024-01-01\n+++ b/data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        assert_eq!(check(diff, "hello\n", &policy), Ok(()));
    }

    #[test]
    fn test_rejects_multiple_files() {
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n--- other.txt\n+++ other.txt\n@@ -1 +1 @@\n-a\n+b\n";
        let err = check(diff, "hello\n", &policy()).unwrap_err();
        assert_eq!(
            err,
            ValidationIssue::MultipleFiles {
                files: vec!["data.txt".into(), "other.txt".into()]
            }
        );
        assert!(err.to_string().contains("multiple files"));
    }

    #[test]
    fn test_prefixed_headers_count_as_distinct_files() {
        let diff = "--- a/data.txt\n+++ b/data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        let err = check(diff, "hello\n", &policy()).unwrap_err();
        assert!(matches!(err, ValidationIssue::MultipleFiles { .. }));
    }

    #[test]
    fn test_multiple_files_allowed_by_policy() {
        let policy = Policy {
            allow_multiple_files: true,
            minimum_context_lines: 0,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n--- other.txt\n+++ other.txt\n@@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(check(diff, "hello\n", &policy), Ok(()));
    }

    #[test]
    fn test_rejects_extension() {
        let policy = Policy {
            allowed_extensions: vec![".md".to_string()],
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        let err = check(diff, "hello\n", &policy).unwrap_err();
        assert!(matches!(err, ValidationIssue::ExtensionNotAllowed { .. }));
        assert!(err.to_string().contains("extension not allowed"));
    }

    #[test]
    fn test_empty_extension_list_rejects_everything() {
        let policy = Policy {
            allowed_extensions: Vec::new(),
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        assert!(matches!(
            check(diff, "hello\n", &policy),
            Err(ValidationIssue::ExtensionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_rejects_banned_insertion() {
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-safe content\n+DROP TABLE users;\n";
        let err = check(diff, "safe content\n", &policy()).unwrap_err();
        assert_eq!(
            err,
            ValidationIssue::BannedContent {
                banned: "DROP TABLE".into()
            }
        );
        assert_eq!(
            err.to_string(),
            "Diff attempts to insert banned content: DROP TABLE"
        );
    }

    #[test]
    fn test_banned_content_in_deleted_line_is_fine() {
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-DROP TABLE users;\n+safe\n";
        assert_eq!(check(diff, "DROP TABLE users;\n", &policy()), Ok(()));
    }

    #[test]
    fn test_rejects_deletions_when_forbidden() {
        let policy = Policy {
            forbid_deletions: true,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n";
        let err = check(diff, "hello\n", &policy).unwrap_err();
        assert_eq!(err, ValidationIssue::DeletionsForbidden);
        assert!(err.to_string().contains("deletions not allowed"));
    }

    #[test]
    fn test_pure_insertion_passes_forbid_deletions() {
        let policy = Policy {
            forbid_deletions: true,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n hello\n+world\n";
        assert_eq!(check(diff, "hello\n", &policy), Ok(()));
    }

    #[test]
    fn test_rejects_long_lines() {
        let policy = Policy {
            max_line_length: 5,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n hello\n+123456\n";
        let err = check(diff, "hello\n", &policy).unwrap_err();
        assert_eq!(err, ValidationIssue::LineTooLong { length: 6, max: 5 });
        assert!(err
            .to_string()
            .contains("inserted line exceeds maximum length"));
    }

    #[test]
    fn test_line_length_counts_characters_without_prefix() {
        let policy = Policy {
            max_line_length: 5,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n hello\n+héllo\n";
        assert_eq!(check(diff, "hello\n", &policy), Ok(()));
    }

    #[test]
    fn test_zero_max_line_length_is_unlimited() {
        let policy = Policy {
            max_line_length: 0,
            ..policy()
        };
        let long = "x".repeat(1000);
        let diff = format!("--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n hello\n+{long}\n");
        assert_eq!(check(&diff, "hello\n", &policy), Ok(()));
    }

    #[test]
    fn test_rejects_unknown_context() {
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n goodbye\n+world\n";
        let err = check(diff, "hello\n", &policy()).unwrap_err();
        assert_eq!(
            err,
            ValidationIssue::ContextMismatch {
                line: "goodbye".into()
            }
        );
        assert!(err
            .to_string()
            .contains("context lines do not match original, potential corruption"));
    }

    #[test]
    fn test_context_check_is_membership_only() {
        // "c" exists in the original, just not at line 1.
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n c\n+x\n";
        assert_eq!(check(diff, "a\nb\nc\n", &policy()), Ok(()));
    }

    #[test]
    fn test_context_check_disabled() {
        let policy = Policy {
            minimum_context_lines: 0,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1,2 @@\n goodbye\n+world\n";
        assert_eq!(check(diff, "hello\n", &policy), Ok(()));
    }

    #[test]
    fn test_context_check_reports_unparseable_hunks() {
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+hi\n@@ bogus @@\n";
        assert!(matches!(
            check(diff, "hello\n", &policy()),
            Err(ValidationIssue::MalformedHunks(ParseError::InvalidHunkHeader { .. }))
        ));
    }

    #[test]
    fn test_first_violation_wins() {
        // Wrong file, banned content, long line and bad context all at once:
        // the header rule runs first.
        let policy = Policy {
            max_line_length: 3,
            forbid_deletions: true,
            ..policy()
        };
        let diff = "--- wrong.txt\n+++ wrong.txt\n@@ -1 +1 @@\n nope\n-hello\n+DROP TABLE users;\n";
        assert!(matches!(
            check(diff, "hello\n", &policy),
            Err(ValidationIssue::UnexpectedFilePath { .. })
        ));
    }

    #[test]
    fn test_banned_before_deletions_before_length() {
        let policy = Policy {
            max_line_length: 3,
            forbid_deletions: true,
            ..policy()
        };
        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+DROP TABLE users;\n";
        assert!(matches!(
            check(diff, "hello\n", &policy),
            Err(ValidationIssue::BannedContent { .. })
        ));

        let diff = "--- data.txt\n+++ data.txt\n@@ -1 +1 @@\n-hello\n+long line\n";
        assert_eq!(
            check(diff, "hello\n", &policy),
            Err(ValidationIssue::DeletionsForbidden)
        );
    }
}
