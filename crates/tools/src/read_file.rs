//! File read tool - return a workspace file's text.

use serde::Deserialize;
use toolloop_core::error::ToolError;
use toolloop_core::provider::ToolDefinition;
use toolloop_security::WorkspaceSandbox;

pub const NAME: &str = "read_file";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadFileParams {
    pub path: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description: "Read the contents of a file at the specified path within the workspace".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to the file (e.g., 'sample.txt' or 'data/config.json')"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}

pub async fn run(sandbox: &WorkspaceSandbox, params: ReadFileParams) -> Result<String, ToolError> {
    let target = sandbox.resolve(&params.path)?;

    let metadata = match tokio::fs::metadata(&target).await {
        Ok(metadata) => metadata,
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

    if !metadata.is_file() {
        return Err(ToolError::NotAFile(params.path));
    }

    tokio::fs::read_to_string(&target)
        .await
        .map_err(|e| ToolError::Io {
            action: "read",
            path: params.path,
            reason: e.to_string(),
        })
}
