//! Generation client seam.
//!
//! A [`DiffGenerator`] turns a prompt into diff text. The crate ships a
//! file-backed generator for the CLI; remote model clients implement the
//! same trait outside this crate.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generator response must be text containing a unified diff: {reason}")]
    InvalidResponse { reason: String },

    #[error("generator failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Produces a diff for a prompt. `Ok(None)` means the generator returned
/// nothing at all.
pub trait DiffGenerator {
    fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError>;
}

impl<F> DiffGenerator for F
where
    F: Fn(&str) -> Result<Option<String>, GenerationError>,
{
    fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        self(prompt)
    }
}

/// Wraps a generator and normalises its output.
#[derive(Debug, Clone)]
pub struct TransformationEngine<G> {
    generator: G,
}

impl<G: DiffGenerator> TransformationEngine<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Ask the generator for a diff and trim surrounding whitespace.
    pub fn generate_diff(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .generator
            .generate(prompt)?
            .ok_or_else(|| GenerationError::InvalidResponse {
                reason: "no response".to_string(),
            })?;
        debug!(bytes = response.len(), "generator responded");
        Ok(response.trim().to_string())
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }
}

/// Returns a pre-generated diff from disk, ignoring the prompt.
#[derive(Debug, Clone)]
pub struct FileGenerator {
    path: PathBuf,
}

impl FileGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiffGenerator for FileGenerator {
    fn generate(&self, _prompt: &str) -> Result<Option<String>, GenerationError> {
        let bytes = fs::read(&self.path).map_err(|source| GenerationError::Io {
            path: self.path.clone(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| GenerationError::InvalidResponse {
            reason: format!("{} is not valid UTF-8: {e}", self.path.display()),
        })?;
        Ok(Some(text))
    }
}
