//! Pipeline coordinator.
//!
//! One request runs: read original → render prompt → generate diff →
//! validate → apply (in memory) → back up + atomic overwrite → audit.
//! Any failure before the overwrite leaves the target untouched.

use crate::audit::{AuditError, AuditLog, AuditRecord};
use crate::config::Policy;
use crate::content::{ContentError, OriginalContent};
use crate::diff::{self, ApplyError, ParseError, ValidationIssue};
use crate::generate::{DiffGenerator, GenerationError, TransformationEngine};
use crate::prompt::{self, PromptError, DEFAULT_TEMPLATE};
use crate::update::{FileUpdater, UpdateError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// A single edit request against one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub file_path: PathBuf,
    pub instruction: String,
}

impl UserRequest {
    pub fn new(file_path: impl Into<PathBuf>, instruction: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            instruction: instruction.into(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "TransformationResult carries the applied content and backup path"]
pub struct TransformationResult {
    pub diff: String,
    /// Snapshot the diff was validated and applied against
    pub original_content: String,
    pub applied_content: String,
    /// `None` for dry runs
    pub backup_path: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Target file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid generator response: {reason}")]
    InvalidResponse { reason: String },

    #[error("{0}")]
    Validation(#[from] ValidationIssue),

    #[error("{0}")]
    MalformedPatch(#[from] ParseError),

    #[error("patch could not be applied: {0}")]
    PatchApply(#[from] ApplyError),

    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("{0}")]
    Generation(GenerationError),

    #[error("{0}")]
    Read(ContentError),

    #[error("{0}")]
    Update(#[from] UpdateError),

    #[error("{0}")]
    Audit(#[from] AuditError),
}

impl From<ContentError> for PipelineError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::NotFound { path } => PipelineError::NotFound { path },
            other => PipelineError::Read(other),
        }
    }
}

impl From<GenerationError> for PipelineError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::InvalidResponse { reason } => {
                PipelineError::InvalidResponse { reason }
            }
            other => PipelineError::Generation(other),
        }
    }
}

/// Runs requests against one policy and one generator.
#[derive(Debug)]
pub struct Orchestrator<G> {
    policy: Policy,
    engine: TransformationEngine<G>,
    template: String,
}

impl<G: DiffGenerator> Orchestrator<G> {
    pub fn new(policy: Policy, engine: TransformationEngine<G>) -> Self {
        Self {
            policy,
            engine,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Run the full pipeline and write the result.
    pub fn process(&self, request: &UserRequest) -> Result<TransformationResult, PipelineError> {
        let span = info_span!("process", file = %request.file_path.display());
        let _enter = span.enter();

        let original = OriginalContent::read(&request.file_path)?;
        let (diff, applied_content) = self.transform(request, &original)?;

        let updater = FileUpdater::new(&self.policy.history_dir)?;
        let backup_path = updater.commit(&request.file_path, original.as_str(), &applied_content)?;

        let record = AuditRecord::new(
            &request.file_path,
            &request.instruction,
            &self.policy.version,
            Some(&backup_path),
            original.as_str(),
            &applied_content,
        );
        if let Err(e) = AuditLog::new(&self.policy.audit_log).append(&record) {
            warn!(error = %e, "target was updated but the audit record could not be written");
            return Err(e.into());
        }

        info!(backup = %backup_path.display(), "patch applied");
        Ok(TransformationResult {
            diff,
            original_content: original.as_str().to_string(),
            applied_content,
            backup_path: Some(backup_path),
        })
    }

    /// Run everything up to the write and report what would be applied.
    pub fn check(&self, request: &UserRequest) -> Result<TransformationResult, PipelineError> {
        let span = info_span!("check", file = %request.file_path.display());
        let _enter = span.enter();

        let original = OriginalContent::read(&request.file_path)?;
        let (diff, applied_content) = self.transform(request, &original)?;
        Ok(TransformationResult {
            diff,
            original_content: original.as_str().to_string(),
            applied_content,
            backup_path: None,
        })
    }

    /// Prompt, generate, validate and apply against one snapshot.
    fn transform(
        &self,
        request: &UserRequest,
        original: &OriginalContent,
    ) -> Result<(String, String), PipelineError> {
        let prompt = prompt::render(&self.template, &self.policy, request, original.as_str())?;
        let diff = self.engine.generate_diff(&prompt)?;

        if let Err(issue) = diff::validate(&diff, original, &self.policy, &request.file_path) {
            warn!(%issue, "diff rejected by codex");
            return Err(issue.into());
        }

        let hunks = diff::parse(&diff)?;
        debug!(hunks = hunks.len(), "diff parsed");
        let applied = diff::apply(original, &hunks)?;
        Ok((diff, applied))
    }
}
