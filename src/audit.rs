//! Append-only audit trail, one JSON object per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("failed to write audit log {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One successful transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// UTC, ISO-8601 with trailing `Z`
    pub timestamp: String,
    pub file: String,
    pub request: String,
    pub codex_version: String,
    pub backup_path: Option<String>,
    /// xxh3 of the content before the patch
    pub original_hash: String,
    /// xxh3 of the content after the patch
    pub applied_hash: String,
}

impl AuditRecord {
    pub fn new(
        file: &Path,
        request: &str,
        codex_version: &str,
        backup_path: Option<&Path>,
        original: &str,
        applied: &str,
    ) -> Self {
        Self {
            timestamp: format_timestamp(Utc::now()),
            file: file.display().to_string(),
            request: request.to_string(),
            codex_version: codex_version.to_string(),
            backup_path: backup_path.map(|path| path.display().to_string()),
            original_hash: content_hash(original),
            applied_hash: content_hash(applied),
        }
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub fn content_hash(text: &str) -> String {
    format!("{:016x}", xxh3_64(text.as_bytes()))
}

/// Newline-delimited JSON audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the log and its directory if needed.
    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let io_err = |source| AuditError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        // Single write so concurrent appenders never interleave within a line.
        file.write_all(line.as_bytes()).map_err(io_err)?;
        Ok(())
    }

    /// Read every record back, oldest first.
    pub fn records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}
