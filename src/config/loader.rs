use crate::config::schema::{CodexFile, Policy};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    NotJson {
        path: PathBuf,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        match self {
            ConfigError::Json { path: None, source } => ConfigError::Json {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotJson { path } => {
                write!(f, "codex must be a JSON file: {}", path.display())
            }
            ConfigError::Io { path, source } => {
                write!(f, "failed to read codex from {}: {}", path.display(), source)
            }
            ConfigError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse codex JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse codex JSON: {}", source),
            },
            ConfigError::CreateDir { path, source } => {
                write!(
                    f,
                    "failed to create codex directory {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NotJson { .. } => None,
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::CreateDir { source, .. } => Some(source),
        }
    }
}

/// Parse a codex document. Does not touch the filesystem.
pub fn load_from_str(input: &str) -> Result<Policy, ConfigError> {
    let file: CodexFile =
        serde_json::from_str(input).map_err(|source| ConfigError::Json { path: None, source })?;
    Ok(file.into())
}

/// Read and parse a codex file, then create its history directory and the
/// audit log's parent directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Policy, ConfigError> {
    let path = path.as_ref();
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return Err(ConfigError::NotJson {
            path: path.to_path_buf(),
        });
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let policy = load_from_str(&contents).map_err(|error| error.with_path(path))?;
    prepare_directories(&policy)?;
    Ok(policy)
}

/// Create `history_dir` and the parent of `audit_log` if absent.
pub fn prepare_directories(policy: &Policy) -> Result<(), ConfigError> {
    let audit_parent = policy
        .audit_log
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty());

    for dir in std::iter::once(policy.history_dir.as_path()).chain(audit_parent) {
        fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
