use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codex_guard::{
    diff, load_from_path, FileGenerator, OriginalContent, Orchestrator, PipelineError,
    TransformationEngine, UserRequest,
};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "codex-guard")]
#[command(about = "Apply generated unified diffs under a codex policy", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a generated diff and apply it to the target file
    Apply {
        /// Path to the target text file
        file: PathBuf,

        /// Instruction the diff was generated for
        instruction: String,

        /// Pre-generated unified diff returned by the generator
        #[arg(long)]
        diff: PathBuf,

        /// Path to the codex policy
        #[arg(long, env = "CODEX_GUARD_CODEX", default_value = "codex/codex.json")]
        codex: PathBuf,

        /// Prompt template (built-in template if not specified)
        #[arg(long)]
        prompt_template: Option<PathBuf>,

        /// Dry run - validate and apply in memory without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show a diff of the change instead of the applied content
        #[arg(short, long)]
        show_diff: bool,
    },

    /// Check a diff against the codex without applying it
    Validate {
        /// Path to the target text file
        file: PathBuf,

        /// Unified diff to check
        #[arg(long)]
        diff: PathBuf,

        /// Path to the codex policy
        #[arg(long, env = "CODEX_GUARD_CODEX", default_value = "codex/codex.json")]
        codex: PathBuf,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Apply {
            file,
            instruction,
            diff,
            codex,
            prompt_template,
            dry_run,
            show_diff,
        } => cmd_apply(
            &file,
            instruction,
            &diff,
            &codex,
            prompt_template.as_deref(),
            dry_run,
            show_diff,
        ),

        Commands::Validate { file, diff, codex } => cmd_validate(&file, &diff, &codex),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red(), e);
        if let Some(pipeline_error) = e.downcast_ref::<PipelineError>() {
            eprintln!("  {}", failure_kind(pipeline_error).dimmed());
        }
        std::process::exit(1);
    }
}

fn failure_kind(e: &PipelineError) -> &'static str {
    match e {
        PipelineError::NotFound { .. } => "NotFound: no generation was attempted",
        PipelineError::InvalidResponse { .. } => "InvalidResponse: generator output unusable",
        PipelineError::Validation(_) => "ValidationIssue: rejected by codex, nothing written",
        PipelineError::MalformedPatch(_) => "MalformedPatch: diff could not be parsed",
        PipelineError::PatchApply(_) => {
            "PatchApplyError: diff disagrees with the file, nothing written"
        }
        _ => "pipeline aborted",
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    file: &Path,
    instruction: String,
    diff_path: &Path,
    codex: &Path,
    prompt_template: Option<&Path>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let policy = load_from_path(codex)?;
    let engine = TransformationEngine::new(FileGenerator::new(diff_path));
    let mut orchestrator = Orchestrator::new(policy, engine);
    if let Some(path) = prompt_template {
        let template = fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt template {}", path.display()))?;
        orchestrator = orchestrator.with_template(template);
    }

    let request = UserRequest::new(file, instruction);
    let result = if dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
        orchestrator.check(&request)?
    } else {
        orchestrator.process(&request)?
    };

    if show_diff {
        display_diff(file, &result.original_content, &result.applied_content);
    } else {
        print!("{}", result.applied_content);
    }

    if let Some(backup) = &result.backup_path {
        eprintln!(
            "{} {} (backup: {})",
            "✓".green(),
            file.display(),
            backup.display()
        );
    }
    Ok(())
}

fn cmd_validate(file: &Path, diff_path: &Path, codex: &Path) -> Result<()> {
    let policy = load_from_path(codex)?;
    let original = OriginalContent::read(file).map_err(PipelineError::from)?;
    let engine = TransformationEngine::new(FileGenerator::new(diff_path));
    let diff_text = engine.generate_diff("").map_err(PipelineError::from)?;

    diff::validate(&diff_text, &original, &policy, file).map_err(PipelineError::from)?;
    let hunks = diff::parse(&diff_text).map_err(PipelineError::from)?;
    diff::apply(&original, &hunks).map_err(PipelineError::from)?;

    let (inserted, deleted) = hunks
        .iter()
        .flat_map(|hunk| &hunk.operations)
        .fold((0, 0), |(ins, del), op| match op {
            codex_guard::LineOp::Insert(_) => (ins + 1, del),
            codex_guard::LineOp::Delete(_) => (ins, del + 1),
            codex_guard::LineOp::Context(_) => (ins, del),
        });

    println!(
        "{} {}: {} hunk(s), {} insertion(s), {} deletion(s) accepted by codex \"{}\" v{}",
        "✓".green(),
        file.display(),
        hunks.len(),
        format!("+{}", inserted).green(),
        format!("-{}", deleted).red(),
        policy.name,
        policy.version
    );
    Ok(())
}
