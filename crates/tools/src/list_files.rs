//! File listing tool - glob the workspace.

use std::path::PathBuf;

use serde::Deserialize;
use toolloop_core::error::ToolError;
use toolloop_core::provider::ToolDefinition;
use toolloop_security::WorkspaceSandbox;

pub const NAME: &str = "list_files";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListFilesParams {
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    "*".into()
}

impl Default for ListFilesParams {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
        }
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description: "List files in the workspace matching a glob pattern".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern to match files (e.g., '*.txt', '**/*.py'). Defaults to '*'",
                    "default": "*"
                }
            },
            "required": [],
            "additionalProperties": false
        }),
    }
}

/// A regular file matched by a workspace glob.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MatchedFile {
    /// Root-relative path with `/` separators
    pub relative: String,
    pub absolute: PathBuf,
}

/// Expand `pattern` relative to the sandbox root, keeping regular files only.
///
/// The pattern goes through the sandbox like any other path, so `../*`
/// and absolute patterns elsewhere are refused. Matches reached through a
/// symlink that leaves the root are dropped. Blocking; call from
/// `spawn_blocking`.
pub(crate) fn glob_files(
    sandbox: &WorkspaceSandbox,
    pattern: &str,
) -> Result<Vec<MatchedFile>, ToolError> {
    let resolved = sandbox.resolve(pattern)?;
    let relative = sandbox
        .relative(&resolved)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let root = glob::Pattern::escape(&sandbox.root().to_string_lossy());
    let full = if relative.is_empty() {
        root
    } else {
        format!("{root}/{relative}")
    };

    let paths = glob::glob(&full).map_err(|e| ToolError::InvalidPattern {
        kind: "glob",
        reason: e.to_string(),
    })?;

    let mut files: Vec<MatchedFile> = paths
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .filter(|path| {
            let inside = sandbox.is_inside(path);
            if !inside {
                tracing::warn!(path = %path.display(), "Skipping match that leaves the workspace");
            }
            inside
        })
        .filter_map(|absolute| {
            let relative = sandbox.relative(&absolute)?.to_string_lossy().replace('\\', "/");
            Some(MatchedFile { relative, absolute })
        })
        .collect();
    files.sort();
    Ok(files)
}

pub async fn run(sandbox: &WorkspaceSandbox, params: ListFilesParams) -> Result<String, ToolError> {
    let sandbox = sandbox.clone();
    let pattern = params.pattern;

    let files = tokio::task::spawn_blocking({
        let pattern = pattern.clone();
        move || glob_files(&sandbox, &pattern)
    })
    .await
    .map_err(|e| ToolError::Io {
        action: "list",
        path: pattern.clone(),
        reason: e.to_string(),
    })??;

    if files.is_empty() {
        return Ok("No files found matching pattern".into());
    }

    tracing::debug!(pattern = %pattern, count = files.len(), "Listed files");
    Ok(files
        .into_iter()
        .map(|f| f.relative)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, WorkspaceSandbox) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("notes.md"), "n").unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("src/main.py"), "print()").unwrap();
        std::fs::write(dir.path().join("src/nested/util.py"), "pass").unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    fn pattern(p: &str) -> ListFilesParams {
        ListFilesParams { pattern: p.into() }
    }

    #[test]
    fn pattern_defaults_to_star() {
        let params: ListFilesParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(params.pattern, "*");
    }

    #[tokio::test]
    async fn default_pattern_lists_top_level_files_only() {
        let (_dir, sandbox) = workspace();
        let listing = run(&sandbox, ListFilesParams::default()).await.unwrap();
        assert_eq!(listing, "a.txt\nb.txt\nnotes.md");
    }

    #[tokio::test]
    async fn extension_filter() {
        let (_dir, sandbox) = workspace();
        assert_eq!(run(&sandbox, pattern("*.txt")).await.unwrap(), "a.txt\nb.txt");
    }

    #[tokio::test]
    async fn recursive_pattern() {
        let (_dir, sandbox) = workspace();
        assert_eq!(
            run(&sandbox, pattern("**/*.py")).await.unwrap(),
            "src/main.py\nsrc/nested/util.py"
        );
    }

    #[tokio::test]
    async fn no_matches() {
        let (_dir, sandbox) = workspace();
        assert_eq!(
            run(&sandbox, pattern("*.rs")).await.unwrap(),
            "No files found matching pattern"
        );
    }

    #[tokio::test]
    async fn empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();
        assert_eq!(
            run(&sandbox, ListFilesParams::default()).await.unwrap(),
            "No files found matching pattern"
        );
    }

    #[tokio::test]
    async fn escaping_pattern_is_rejected() {
        let (dir, _) = workspace();
        let sandbox = WorkspaceSandbox::new(dir.path().join("src")).unwrap();
        let err = run(&sandbox, pattern("../*")).await.unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
    }

    #[tokio::test]
    async fn malformed_glob_is_reported() {
        let (_dir, sandbox) = workspace();
        let err = run(&sandbox, pattern("***")).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid glob pattern"));
    }
}
