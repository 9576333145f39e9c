//! Codex policy file schema.
//!
//! The on-disk shape is `{ "metadata": {...}, "guardrails": {...} }`; every
//! key is optional and falls back to the defaults below. [`Policy`] is the
//! flattened, immutable record the rest of the crate works with.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

pub const DEFAULT_CODEX_NAME: &str = "codex";
pub const DEFAULT_CODEX_VERSION: &str = "1.0.0";
pub const DEFAULT_AUDIT_LOG: &str = "logs/audit.log";
pub const DEFAULT_HISTORY_DIR: &str = ".codex/history";
pub const DEFAULT_MINIMUM_CONTEXT_LINES: usize = 2;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CodexFile {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub guardrails: Guardrails,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
    /// Accepts `"1.2"` as well as a bare JSON number.
    #[serde(deserialize_with = "version_string")]
    pub version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_CODEX_NAME.to_string(),
            version: DEFAULT_CODEX_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Guardrails {
    pub allowed_extensions: Vec<String>,
    pub forbid_deletions: bool,
    pub max_line_length: usize,
    pub minimum_context_lines: usize,
    pub banned_insertions: Vec<String>,
    pub enforce_diff_prefix: bool,
    pub audit_log: PathBuf,
    pub history_dir: PathBuf,
    pub require_unified_diff: bool,
    pub allow_multiple_files: bool,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            allowed_extensions: Vec::new(),
            forbid_deletions: false,
            max_line_length: 0,
            minimum_context_lines: DEFAULT_MINIMUM_CONTEXT_LINES,
            banned_insertions: Vec::new(),
            enforce_diff_prefix: true,
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            require_unified_diff: true,
            allow_multiple_files: false,
        }
    }
}

fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(version) => Ok(version),
        serde_json::Value::Number(version) => Ok(version.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "metadata.version must be a string or number, found {other}"
        ))),
    }
}

/// The guardrails a diff must satisfy, loaded once per run.
///
/// Read-only after construction; validation and application only borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: String,
    pub version: String,
    /// Suffixes permitted as patch targets (e.g. `.txt`)
    pub allowed_extensions: Vec<String>,
    /// Reject any removed line
    pub forbid_deletions: bool,
    /// Cap on inserted-line length in characters; 0 = unlimited
    pub max_line_length: usize,
    /// If > 0, every context line must exist in the original
    pub minimum_context_lines: usize,
    /// Substrings that may never appear in an inserted line
    pub banned_insertions: Vec<String>,
    /// Require the diff to begin with a `---` header
    pub enforce_diff_prefix: bool,
    /// Require at least one `@@` hunk marker
    pub require_unified_diff: bool,
    /// Allow headers naming more than one file
    pub allow_multiple_files: bool,
    pub audit_log: PathBuf,
    pub history_dir: PathBuf,
}

impl Default for Policy {
    fn default() -> Self {
        CodexFile::default().into()
    }
}

impl From<CodexFile> for Policy {
    fn from(file: CodexFile) -> Self {
        let CodexFile {
            metadata,
            guardrails,
        } = file;
        Self {
            name: metadata.name,
            version: metadata.version,
            allowed_extensions: guardrails.allowed_extensions,
            forbid_deletions: guardrails.forbid_deletions,
            max_line_length: guardrails.max_line_length,
            minimum_context_lines: guardrails.minimum_context_lines,
            banned_insertions: guardrails.banned_insertions,
            enforce_diff_prefix: guardrails.enforce_diff_prefix,
            require_unified_diff: guardrails.require_unified_diff,
            allow_multiple_files: guardrails.allow_multiple_files,
            audit_log: guardrails.audit_log,
            history_dir: guardrails.history_dir,
        }
    }
}
