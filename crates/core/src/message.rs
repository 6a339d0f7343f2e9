//! Message and Conversation domain types.
//!
//! A conversation is built by the caller, handed to one agent-loop
//! invocation, and grown by that invocation as tool rounds complete.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content. `None` for assistant turns that only request tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message that carries only tool-call requests.
    pub fn assistant_tool_calls(tool_calls: Vec<MessageToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, None)
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, Some(content.into()))
        }
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as the raw JSON text the model produced
    pub arguments: String,
}

/// An ordered, append-only sequence of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append several messages, preserving their order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Prepend `prompt` as a system message unless the conversation already
    /// opens with one.
    pub fn ensure_system_prompt(&mut self, prompt: &str) {
        let has_system = self
            .messages
            .first()
            .is_some_and(|m| m.role == Role::System);
        if !has_system {
            self.messages.insert(0, Message::system(prompt));
        }
    }

    /// Check that every tool message answers a call made by the assistant
    /// message it follows. Only tool messages may sit between that assistant
    /// message and its results.
    pub fn validate_tool_links(&self) -> Result<()> {
        let mut open_calls: Option<Vec<&str>> = None;

        for (position, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::Assistant => {
                    open_calls = Some(message.tool_calls.iter().map(|tc| tc.id.as_str()).collect());
                }
                Role::Tool => {
                    let Some(id) = message.tool_call_id.as_deref() else {
                        return Err(Error::InvalidConversation(format!(
                            "tool message at position {position} has no tool_call_id"
                        )));
                    };
                    let linked = open_calls.as_ref().is_some_and(|ids| ids.contains(&id));
                    if !linked {
                        return Err(Error::InvalidConversation(format!(
                            "tool message at position {position} references unknown call '{id}'"
                        )));
                    }
                }
                Role::User | Role::System => open_calls = None,
            }
        }

        Ok(())
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl From<Conversation> for Vec<Message> {
    fn from(conversation: Conversation) -> Self {
        conversation.messages
    }
}
