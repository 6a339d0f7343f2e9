//! File edit tool - replace every occurrence of a search string.

use serde::Deserialize;
use toolloop_core::error::ToolError;
use toolloop_core::provider::ToolDefinition;
use toolloop_security::WorkspaceSandbox;

pub const NAME: &str = "edit_file";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditFileParams {
    pub path: String,
    /// Never empty; rejected at dispatch.
    pub search: String,
    pub replace: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description:
            "Edit a file by replacing all occurrences of a search string with a replacement string"
                .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to the file within the workspace"
                },
                "search": {
                    "type": "string",
                    "description": "The string to search for in the file"
                },
                "replace": {
                    "type": "string",
                    "description": "The string to replace the search string with"
                }
            },
            "required": ["path", "search", "replace"],
            "additionalProperties": false
        }),
    }
}

pub async fn run(sandbox: &WorkspaceSandbox, params: EditFileParams) -> Result<String, ToolError> {
    let target = sandbox.resolve(&params.path)?;

    let content = match tokio::fs::read_to_string(&target).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::FileNotFound(params.path));
        }
        Err(e) => {
            return Err(ToolError::Io {
                action: "read",
                path: params.path,
                reason: e.to_string(),
            });
        }
    };

    let count = content.matches(params.search.as_str()).count();
    if count == 0 {
        return Err(ToolError::SearchStringNotFound(params.path));
    }

    let updated = content.replace(params.search.as_str(), &params.replace);
    tokio::fs::write(&target, updated)
        .await
        .map_err(|e| ToolError::Io {
            action: "write",
            path: params.path.clone(),
            reason: e.to_string(),
        })?;

    tracing::debug!(path = %params.path, count, "Edited file");
    Ok(format!("Replaced {count} occurrence(s) in {}", params.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(path: &str, search: &str, replace: &str) -> EditFileParams {
        EditFileParams {
            path: path.into(),
            search: search.into(),
            replace: replace.into(),
        }
    }

    #[tokio::test]
    async fn replaces_all_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "foo bar foo").unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();

        let msg = run(&sandbox, params("a.txt", "foo", "baz")).await.unwrap();
        assert_eq!(msg, "Replaced 2 occurrence(s) in a.txt");
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "baz bar baz");
    }

    #[tokio::test]
    async fn missing_search_string_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();

        let err = run(&sandbox, params("a.txt", "absent", "x")).await.unwrap_err();
        assert_eq!(err.to_string(), "Search string not found in a.txt");
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();

        let err = run(&sandbox, params("gone.txt", "a", "b")).await.unwrap_err();
        assert_eq!(err.to_string(), "File not found: gone.txt");
    }

    #[tokio::test]
    async fn edit_outside_workspace_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("outside.txt"), "keep me").unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path().join("ws")).unwrap();

        let err = run(&sandbox, params("../outside.txt", "keep", "lose")).await.unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
        assert_eq!(std::fs::read_to_string(dir.path().join("outside.txt")).unwrap(), "keep me");
    }
}
