//! Agent-level output events.
//!
//! `AgentEvent` is what the loop yields to its caller; the gateway forwards
//! each one as an SSE event named by [`AgentEvent::event_type`] with the
//! serialized variant as its data.

use serde::Serialize;

/// Events emitted by the agent while an invocation runs.
///
/// - `content_delta`    - a text fragment from the model
/// - `tool_call_start`  - a tool call is about to run
/// - `tool_call_result` - a tool call finished
/// - `done`             - the invocation is complete
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentEvent {
    ContentDelta {
        delta: String,
    },

    /// `arguments` is `{}` and `error` is set when the argument text was
    /// not valid JSON.
    /// `name` is `null` when the model never sent one.
    ToolCallStart {
        id: String,
        name: Option<String>,
        arguments: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    ToolCallResult {
        id: String,
        result: String,
        is_error: bool,
    },

    Done {},
}

impl AgentEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ContentDelta { .. } => "content_delta",
            Self::ToolCallStart { .. } => "tool_call_start",
            Self::ToolCallResult { .. } => "tool_call_result",
            Self::Done {} => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done {})
    }
}
