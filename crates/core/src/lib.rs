//! # toolloop core
//!
//! Domain types, traits, and error definitions for the toolloop agent runtime.
//! This crate has no framework dependencies. It defines the model that the
//! provider, tool, agent, and gateway crates implement against.
//!
//! The two seams the agent loop talks through are defined here:
//! - [`Provider`] streams chat-completion chunks from a model endpoint
//! - [`ToolExecutor`] runs a named tool and always answers with text

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{
    ChunkStream, FinishReason, Provider, ProviderRequest, StreamChunk, ToolCallDelta,
    ToolDefinition, Usage,
};
pub use tool::{ERROR_PREFIX, ToolExecutor, ToolResult};
