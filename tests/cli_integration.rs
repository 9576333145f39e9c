//! Integration tests for the command-line interface
//!
//! Tests the apply and validate commands against a temp workspace

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to create a workspace with a codex, a target file and a diff
fn setup_test_workspace(diff_body: &str) -> (TempDir, PathBuf, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();

    let target = dir.path().join("notes.txt");
    fs::write(&target, "hello\n").unwrap();

    let codex = dir.path().join("codex.json");
    fs::write(
        &codex,
        serde_json::json!({
            "metadata": {"name": "cli", "version": "2.1"},
            "guardrails": {
                "allowed_extensions": [".txt"],
                "max_line_length": 80,
                "minimum_context_lines": 1,
                "banned_insertions": ["rm -rf"],
                "audit_log": dir.path().join("logs/audit.jsonl"),
                "history_dir": dir.path().join("history"),
            }
        })
        .to_string(),
    )
    .unwrap();

    let path = target.display();
    let diff = dir.path().join("change.diff");
    fs::write(&diff, format!("--- {path}\n+++ {path}\n{diff_body}")).unwrap();

    (dir, target, codex, diff)
}

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_codex-guard"))
        .args(args)
        .current_dir(cwd)
        .env_remove("CODEX_GUARD_CODEX")
        .output()
        .unwrap()
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help_lists_commands() {
    let output = run(&["--help"], Path::new("."));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("apply"));
    assert!(stdout.contains("validate"));
}

#[test]
fn test_apply_writes_file() {
    let (dir, target, codex, diff) = setup_test_workspace("@@ -1 +1,2 @@\n hello\n+world\n");

    let output = run(
        &["apply", s(&target), "add world", "--diff", s(&diff), "--codex", s(&codex)],
        dir.path(),
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\nworld\n");
    assert_eq!(fs::read_to_string(&target).unwrap(), "hello\nworld\n");
    assert_eq!(fs::read_dir(dir.path().join("history")).unwrap().count(), 1);
    assert!(dir.path().join("logs/audit.jsonl").exists());
}

#[test]
fn test_apply_show_diff_uses_pre_patch_content() {
    let (dir, target, codex, diff) = setup_test_workspace("@@ -1 +1 @@\n-hello\n+goodbye\n");

    let output = run(
        &[
            "apply",
            s(&target),
            "say goodbye",
            "--diff",
            s(&diff),
            "--codex",
            s(&codex),
            "--show-diff",
        ],
        dir.path(),
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-hello"));
    assert!(stdout.contains("+goodbye"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "goodbye\n");
}

#[test]
fn test_apply_dry_run_leaves_file() {
    let (dir, target, codex, diff) = setup_test_workspace("@@ -1 +1,2 @@\n hello\n+world\n");

    let output = run(
        &[
            "apply",
            s(&target),
            "add world",
            "--diff",
            s(&diff),
            "--codex",
            s(&codex),
            "--dry-run",
        ],
        dir.path(),
    );

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("hello\nworld\n"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
    assert_eq!(fs::read_dir(dir.path().join("history")).unwrap().count(), 0);
}

#[test]
fn test_apply_rejects_banned_content() {
    let (dir, target, codex, diff) = setup_test_workspace("@@ -1 +1,2 @@\n hello\n+rm -rf /\n");

    let output = run(
        &["apply", s(&target), "cleanup", "--diff", s(&diff), "--codex", s(&codex)],
        dir.path(),
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("banned content: rm -rf"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
}

#[test]
fn test_validate_reports_summary() {
    let (dir, target, codex, diff) =
        setup_test_workspace("@@ -1 +1,2 @@\n-hello\n+hello there\n+world\n");

    let output = run(
        &["validate", s(&target), "--diff", s(&diff), "--codex", s(&codex)],
        dir.path(),
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 hunk(s)"));
    assert!(stdout.contains("cli"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
}

#[test]
fn test_validate_missing_file() {
    let (dir, _target, codex, diff) = setup_test_workspace("@@ -1 +1,2 @@\n hello\n+world\n");
    let missing = dir.path().join("missing.txt");

    let output = run(
        &["validate", s(&missing), "--diff", s(&diff), "--codex", s(&codex)],
        dir.path(),
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
