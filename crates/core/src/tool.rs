//! Tool executor seam - how the agent loop runs the tools a model asks for.
//!
//! Executors never fail: every problem (unknown tool, wrong argument shape,
//! I/O errors, sandbox violations) comes back as result text that starts
//! with [`ERROR_PREFIX`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provider::ToolDefinition;

/// Marker that opens every failed tool result.
pub const ERROR_PREFIX: &str = "Error:";

/// The core executor trait.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// The fixed catalog sent to the model with every request.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run `name` with already-parsed arguments.
    async fn execute(&self, name: &str, arguments: serde_json::Value) -> String;
}

/// The result of one tool call, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The output text
    pub output: String,

    pub is_error: bool,
}

impl ToolResult {
    /// Build a result from executor output, flagging it by the error marker.
    pub fn from_output(call_id: impl Into<String>, output: String) -> Self {
        let is_error = output.starts_with(ERROR_PREFIX);
        Self {
            call_id: call_id.into(),
            output,
            is_error,
        }
    }

    /// A failure produced without running any tool.
    pub fn error(call_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            call_id: call_id.into(),
            output: format!("{ERROR_PREFIX} {reason}"),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple executor for unit tests.
    struct EchoExecutor;

    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "echo".into(),
                description: "Echoes back the input".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }]
        }

        async fn execute(&self, name: &str, arguments: serde_json::Value) -> String {
            match (name, arguments["text"].as_str()) {
                ("echo", Some(text)) => text.to_string(),
                ("echo", None) => "Error: Invalid arguments for echo: missing text".into(),
                (other, _) => format!("Error: Unknown tool: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn executor_results_are_flagged_by_prefix() {
        let exec = EchoExecutor;
        let ok = ToolResult::from_output("c1", exec.execute("echo", serde_json::json!({"text": "hi"})).await);
        assert!(!ok.is_error);
        assert_eq!(ok.output, "hi");

        let missing = ToolResult::from_output("c2", exec.execute("nope", serde_json::json!({})).await);
        assert!(missing.is_error);
        assert_eq!(missing.output, "Error: Unknown tool: nope");
    }

    #[test]
    fn synthetic_error_result() {
        let result = ToolResult::error("c3", "Invalid JSON arguments: EOF");
        assert!(result.is_error);
        assert_eq!(result.output, "Error: Invalid JSON arguments: EOF");
    }

    #[test]
    fn error_marker_must_lead() {
        let result = ToolResult::from_output("c4", "No Error: here".into());
        assert!(!result.is_error);
    }
}
