//! Codex Guard: guarded application of generated unified diffs.
//!
//! A text generator proposes an edit to a single file as a unified diff.
//! The diff is only written to disk after it passes a declarative policy
//! (the "codex") and applies line-exactly to the content it was generated
//! against.
//!
//! # Architecture
//!
//! - [`diff::parse`] turns diff text into [`Hunk`]s. It is the only parser;
//!   validation and application share it.
//! - [`diff::validate`] checks the codex rules in a fixed order and reports
//!   the first violation.
//! - [`diff::apply`] rebuilds the new content in one forward pass, failing
//!   if a deletion disagrees with the original.
//! - [`Orchestrator`] sequences read → generate → validate → apply → backup
//!   → atomic write → audit.
//!
//! # Safety
//!
//! - The same [`OriginalContent`] snapshot is validated and patched
//! - Nothing is written unless validation and application both succeed
//! - Backup is written before the target is replaced
//! - Atomic file writes (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```
//! use codex_guard::{diff, OriginalContent};
//!
//! let original = OriginalContent::new("hello\n");
//! let hunks = diff::parse("--- f\n+++ f\n@@ -1 +1,2 @@\n-hello\n+hello\n+world\n").unwrap();
//! assert_eq!(diff::apply(&original, &hunks).unwrap(), "hello\nworld\n");
//! ```

pub mod audit;
pub mod config;
pub mod content;
pub mod diff;
pub mod generate;
pub mod pipeline;
pub mod prompt;
pub mod update;

// Re-exports
pub use audit::{AuditError, AuditLog, AuditRecord};
pub use config::{load_from_path, load_from_str, ConfigError, Policy};
pub use content::{ContentError, OriginalContent};
pub use diff::{ApplyError, Hunk, LineOp, ParseError, ValidationIssue};
pub use generate::{DiffGenerator, FileGenerator, GenerationError, TransformationEngine};
pub use pipeline::{Orchestrator, PipelineError, TransformationResult, UserRequest};
pub use prompt::{PromptError, DEFAULT_TEMPLATE};
pub use update::{FileUpdater, UpdateError};
