//! Delta accumulator - rebuilds tool calls from streamed fragments.
//!
//! The stream index is the only correlation key. The first fragment seen
//! for an index is a header: it fixes the call's id and name, and any
//! argument text it carries is dropped. Later fragments for the same index
//! only append argument text.

use toolloop_core::message::MessageToolCall;
use toolloop_core::provider::ToolCallDelta;
use tracing::warn;

/// A tool call under construction within one streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    pub index: u32,
    pub id: String,
    pub name: Option<String>,
    /// Raw argument text, possibly incomplete JSON until the stream ends.
    pub arguments: String,
}

impl PendingToolCall {
    /// The form recorded in the assistant message.
    pub fn to_message_call(&self) -> MessageToolCall {
        MessageToolCall {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_default(),
            arguments: self.arguments.clone(),
        }
    }
}

/// Pending calls for one round, in the order their indices were first seen.
#[derive(Debug, Clone, Default)]
pub struct PendingToolCalls {
    calls: Vec<PendingToolCall>,
}

impl PendingToolCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk's tool-call fragments into the pending set.
    pub fn apply(&mut self, deltas: &[ToolCallDelta]) {
        for delta in deltas {
            match self.calls.iter_mut().find(|c| c.index == delta.index) {
                Some(call) => {
                    if let Some(chunk) = delta.arguments.as_deref() {
                        call.arguments.push_str(chunk);
                    }
                }
                None => {
                    let id = delta.id.clone().unwrap_or_else(|| {
                        warn!(index = delta.index, "Tool call header arrived without an id");
                        String::new()
                    });
                    self.calls.push(PendingToolCall {
                        index: delta.index,
                        id,
                        name: delta.name.clone(),
                        arguments: String::new(),
                    });
                }
            }
        }
    }

    pub fn get(&self, index: u32) -> Option<&PendingToolCall> {
        self.calls.iter().find(|c| c.index == index)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingToolCall> {
        self.calls.iter()
    }

    pub fn into_calls(self) -> Vec<PendingToolCall> {
        self.calls
    }
}
