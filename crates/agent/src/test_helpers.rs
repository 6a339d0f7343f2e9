//! Shared test helpers for agent loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use toolloop_core::error::ProviderError;
use toolloop_core::provider::{
    ChunkStream, FinishReason, Provider, ProviderRequest, StreamChunk, ToolCallDelta,
};
use toolloop_core::tool::ToolExecutor;
use toolloop_core::ToolDefinition;

/// One scripted model response.
pub enum Turn {
    /// The stream yields these items in order.
    Chunks(Vec<Result<StreamChunk, ProviderError>>),
    /// `stream()` itself fails.
    Fail(ProviderError),
}

/// A mock provider that returns a sequence of scripted streams.
///
/// Each call to `stream` consumes the next turn and records the request.
/// Panics if more calls are made than turns provided.
pub struct SequentialMockProvider {
    turns: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(Turn::Chunks(items)) => Ok(Box::pin(futures::stream::iter(items))),
            Some(Turn::Fail(err)) => Err(err),
            None => panic!("SequentialMockProvider: no more turns (call #{call})"),
        }
    }
}

/// A streamed text reply in the given fragments, ended by `stop`.
pub fn text_turn(fragments: &[&str]) -> Turn {
    let mut items: Vec<Result<StreamChunk, ProviderError>> =
        fragments.iter().map(|f| Ok(StreamChunk::text(*f))).collect();
    items.push(Ok(StreamChunk::finished(FinishReason::Stop)));
    Turn::Chunks(items)
}

/// One header fragment per call, then its full argument text, then
/// `tool_calls`.
pub fn tool_turn(calls: &[(&str, &str, &str)]) -> Turn {
    let mut items = Vec::new();
    for (index, (id, name, arguments)) in calls.iter().enumerate() {
        let index = index as u32;
        items.push(Ok(StreamChunk::tool_calls(vec![header(index, id, name)])));
        items.push(Ok(StreamChunk::tool_calls(vec![arguments_delta(index, arguments)])));
    }
    items.push(Ok(StreamChunk::finished(FinishReason::ToolCalls)));
    Turn::Chunks(items)
}

pub fn header(index: u32, id: &str, name: &str) -> ToolCallDelta {
    ToolCallDelta {
        index,
        id: Some(id.into()),
        name: Some(name.into()),
        arguments: None,
    }
}

pub fn arguments_delta(index: u32, chunk: &str) -> ToolCallDelta {
    ToolCallDelta {
        index,
        arguments: Some(chunk.into()),
        ..ToolCallDelta::default()
    }
}

/// An executor that records calls and answers `"{name} ok"`; the tool
/// named `broken` answers with an error string.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RecordingExecutor {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "list_files".into(),
            description: "List files".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }]
    }

    async fn execute(&self, name: &str, arguments: serde_json::Value) -> String {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        match name {
            "broken" => "Error: broken tool".into(),
            "list_files" => "No files found matching pattern".into(),
            other => format!("{other} ok"),
        }
    }
}
