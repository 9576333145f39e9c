//! Immutable snapshot of a target file.
//!
//! The same snapshot feeds validation and application so both stages agree
//! on what the file looked like.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Target file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Original file text split into lines, with its trailing-newline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalContent {
    text: String,
    lines: Vec<String>,
    trailing_newline: bool,
}

impl OriginalContent {
    /// Snapshot in-memory text. `\n` and `\r\n` both end a line.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        let trailing_newline = text.ends_with('\n');
        Self {
            text,
            lines,
            trailing_newline,
        }
    }

    /// Read a snapshot from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::new(text)),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(ContentError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(ContentError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// The verbatim text as read.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Distinct lines, for membership checks.
    pub fn line_set(&self) -> HashSet<&str> {
        self.lines.iter().map(String::as_str).collect()
    }
}
