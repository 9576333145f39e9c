//! Prompt rendering.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal
//! braces. Unknown placeholders are an error rather than passed through, so
//! a typo in a template never reaches the generator.

use crate::config::Policy;
use crate::pipeline::UserRequest;
use thiserror::Error;

/// Template used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = "\
You are editing a single text file under the codex \"{codex_name}\" (version {codex_version}).

Rules:
- Allowed file extensions: {allowed_extensions}
- Deletions allowed: {deletions_allowed}
- Maximum inserted line length (0 = unlimited): {max_line_length}
- Minimum context lines: {minimum_context}
- Never insert: {banned_insertions}
- Diff must start with file headers: {enforce_diff_prefix}
- Unified diff hunks required: {require_unified_diff}
- Multiple files allowed: {allow_multiple_files}

Request: {user_request}

File: {file_path}
```
{file_content}
```

Respond ONLY with a unified diff (--- / +++ headers naming {file_path}, then @@ hunks). No prose.
";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("unknown placeholder '{{{name}}}' in prompt template")]
    UnknownPlaceholder { name: String },

    #[error("unmatched '{brace}' at byte {offset} in prompt template")]
    UnmatchedBrace { brace: char, offset: usize },
}

/// Render `template` for one request.
pub fn render(
    template: &str,
    policy: &Policy,
    request: &UserRequest,
    file_content: &str,
) -> Result<String, PromptError> {
    let values = placeholder_values(policy, request, file_content);
    let lookup = |name: &str| {
        values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    };

    let mut out = String::with_capacity(template.len() + file_content.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let offset = template.len() - tail.len();

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if tail.starts_with('}') {
            return Err(PromptError::UnmatchedBrace { brace: '}', offset });
        } else {
            let end = tail
                .find('}')
                .ok_or(PromptError::UnmatchedBrace { brace: '{', offset })?;
            let name = &tail[1..end];
            let value = lookup(name).ok_or_else(|| PromptError::UnknownPlaceholder {
                name: name.to_string(),
            })?;
            out.push_str(value);
            rest = &tail[end + 1..];
        }
    }
    out.push_str(rest);

    Ok(out)
}

fn placeholder_values(
    policy: &Policy,
    request: &UserRequest,
    file_content: &str,
) -> Vec<(&'static str, String)> {
    let banned = if policy.banned_insertions.is_empty() {
        "(none)".to_string()
    } else {
        policy.banned_insertions.join(", ")
    };

    vec![
        ("codex_name", policy.name.clone()),
        ("codex_version", policy.version.clone()),
        ("allowed_extensions", policy.allowed_extensions.join(", ")),
        ("deletions_allowed", (!policy.forbid_deletions).to_string()),
        ("max_line_length", policy.max_line_length.to_string()),
        ("minimum_context", policy.minimum_context_lines.to_string()),
        ("banned_insertions", banned),
        ("enforce_diff_prefix", policy.enforce_diff_prefix.to_string()),
        ("require_unified_diff", policy.require_unified_diff.to_string()),
        ("allow_multiple_files", policy.allow_multiple_files.to_string()),
        ("user_request", request.instruction.clone()),
        ("file_path", request.file_path.display().to_string()),
        ("file_content", file_content.to_string()),
    ]
}
