//! File write tool - create or overwrite a workspace file.

use serde::Deserialize;
use toolloop_core::error::ToolError;
use toolloop_core::provider::ToolDefinition;
use toolloop_security::WorkspaceSandbox;

pub const NAME: &str = "write_file";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteFileParams {
    pub path: String,
    pub content: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description:
            "Write content to a file. Creates the file if it doesn't exist, overwrites if it does."
                .into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to the file within the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        }),
    }
}

/// Parent directories are created as needed.
pub async fn run(sandbox: &WorkspaceSandbox, params: WriteFileParams) -> Result<String, ToolError> {
    let target = sandbox.resolve(&params.path)?;
    let io_error = |e: std::io::Error| ToolError::Io {
        action: "write",
        path: params.path.clone(),
        reason: e.to_string(),
    };

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(&target, params.content.as_bytes())
        .await
        .map_err(io_error)?;

    let written = params.content.chars().count();
    tracing::debug!(path = %params.path, chars = written, "Wrote file");
    Ok(format!("Successfully wrote {written} characters to {}", params.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(path: &str, content: &str) -> WriteFileParams {
        WriteFileParams {
            path: path.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn write_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();

        let msg = run(&sandbox, params("notes/today.md", "# hi")).await.unwrap();
        assert_eq!(msg, "Successfully wrote 4 characters to notes/today.md");
        let written = std::fs::read_to_string(dir.path().join("notes/today.md")).unwrap();
        assert_eq!(written, "# hi");
    }

    #[tokio::test]
    async fn write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "old contents").unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();

        run(&sandbox, params("a.txt", "new")).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn character_count_is_not_byte_count() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path()).unwrap();

        let msg = run(&sandbox, params("u.txt", "héllo")).await.unwrap();
        assert_eq!(msg, "Successfully wrote 5 characters to u.txt");
    }

    #[tokio::test]
    async fn write_outside_workspace_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = WorkspaceSandbox::new(dir.path().join("ws")).unwrap();

        let err = run(&sandbox, params("../escape.txt", "x")).await.unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
        assert!(!dir.path().join("escape.txt").exists());
    }
}
