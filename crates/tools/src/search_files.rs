//! Search tool - grep-like regex search over workspace files.

use regex::Regex;
use serde::Deserialize;
use toolloop_core::error::ToolError;
use toolloop_core::provider::ToolDefinition;
use toolloop_security::WorkspaceSandbox;

use crate::list_files::glob_files;

pub const NAME: &str = "search_files";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchFilesParams {
    pub pattern: String,
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

fn default_file_pattern() -> String {
    "**/*".into()
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description: "Search for a regex pattern in files within the workspace (grep-like)".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regular expression pattern to search for"
                },
                "file_pattern": {
                    "type": "string",
                    "description": "Glob pattern to filter which files to search (e.g., '*.py'). Defaults to '**/*'",
                    "default": "**/*"
                }
            },
            "required": ["pattern"],
            "additionalProperties": false
        }),
    }
}

/// Lines are reported as `{path}:{line}: {trimmed text}`, files in path
/// order. Files that are not valid UTF-8 are skipped.
fn search(
    sandbox: &WorkspaceSandbox,
    regex: &Regex,
    file_pattern: &str,
) -> Result<Vec<String>, ToolError> {
    let mut results = Vec::new();

    for file in glob_files(sandbox, file_pattern)? {
        let content = match std::fs::read_to_string(&file.absolute) {
            Ok(content) => content,
            Err(e) => {
                tracing::trace!(path = %file.relative, error = %e, "Skipping unreadable file");
                continue;
            }
        };

        for (number, line) in content.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if regex.is_match(line) {
                results.push(format!("{}:{}: {}", file.relative, number + 1, line.trim()));
            }
        }
    }

    Ok(results)
}

pub async fn run(sandbox: &WorkspaceSandbox, params: SearchFilesParams) -> Result<String, ToolError> {
    let regex = Regex::new(&params.pattern).map_err(|e| ToolError::InvalidPattern {
        kind: "regex",
        reason: e.to_string(),
    })?;

    let sandbox = sandbox.clone();
    let file_pattern = params.file_pattern;

    let results = tokio::task::spawn_blocking({
        let file_pattern = file_pattern.clone();
        move || search(&sandbox, &regex, &file_pattern)
    })
    .await
    .map_err(|e| ToolError::Io {
        action: "search",
        path: file_pattern,
        reason: e.to_string(),
    })??;

    if results.is_empty() {
        return Ok("No matches found".into());
    }

    Ok(results.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, WorkspaceSandbox) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\n  TODO: tidy  \nbeta\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.py"), "# TODO later\ndef f(): pass\n").unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00, 0x54]).unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    fn params(pattern: &str, file_pattern: Option<&str>) -> SearchFilesParams {
        SearchFilesParams {
            pattern: pattern.into(),
            file_pattern: file_pattern.map(Into::into).unwrap_or_else(default_file_pattern),
        }
    }

    #[tokio::test]
    async fn matches_across_workspace() {
        let (_dir, sandbox) = workspace();
        let out = run(&sandbox, params("TODO", None)).await.unwrap();
        assert_eq!(out, "a.txt:2: TODO: tidy\nsrc/lib.py:1: # TODO later");
    }

    #[tokio::test]
    async fn file_pattern_narrows_search() {
        let (_dir, sandbox) = workspace();
        let out = run(&sandbox, params("TODO", Some("**/*.py"))).await.unwrap();
        assert_eq!(out, "src/lib.py:1: # TODO later");
    }

    #[tokio::test]
    async fn regex_syntax_is_supported() {
        let (_dir, sandbox) = workspace();
        let out = run(&sandbox, params(r"^def \w+\(", None)).await.unwrap();
        assert_eq!(out, "src/lib.py:2: def f(): pass");
    }

    #[tokio::test]
    async fn no_matches() {
        let (_dir, sandbox) = workspace();
        assert_eq!(run(&sandbox, params("zzz", None)).await.unwrap(), "No matches found");
    }

    #[tokio::test]
    async fn invalid_regex() {
        let (_dir, sandbox) = workspace();
        let err = run(&sandbox, params("(unclosed", None)).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid regex pattern: "));
    }

    #[tokio::test]
    async fn escaping_file_pattern_is_rejected() {
        let (dir, _) = workspace();
        let sandbox = WorkspaceSandbox::new(dir.path().join("src")).unwrap();
        let err = run(&sandbox, params("alpha", Some("../*.txt"))).await.unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
    }
}
