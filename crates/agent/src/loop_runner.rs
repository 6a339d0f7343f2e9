//! The agent loop implementation.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use toolloop_core::error::Error;
use toolloop_core::message::{Conversation, Message};
use toolloop_core::provider::{FinishReason, Provider, ProviderRequest};
use toolloop_core::tool::{ToolExecutor, ToolResult};
use tracing::{debug, info, warn};

use crate::accumulator::{PendingToolCall, PendingToolCalls};
use crate::stream_event::AgentEvent;

/// Prepended when a conversation does not open with a system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to file operation tools.
You can read, write, edit, list, and search files in the workspace.
Always use the tools when the user asks about files or needs file operations.
Be concise and helpful in your responses.";

/// Default cap on request/response rounds per invocation.
pub const DEFAULT_MAX_ROUNDS: u32 = 25;

/// The output of one invocation. An `Err` item is fatal and ends the stream.
pub type AgentStream = BoxStream<'static, Result<AgentEvent, Error>>;

/// The agent loop: drives streaming rounds against the provider and runs
/// the tools the model asks for.
///
/// Holds no per-invocation state, so one instance serves any number of
/// concurrent invocations.
#[derive(Clone)]
pub struct AgentLoop {
    /// The model endpoint
    provider: Arc<dyn Provider>,

    /// Executes tool calls and supplies the catalog
    tools: Arc<dyn ToolExecutor>,

    system_prompt: Arc<str>,

    /// Maximum request/response rounds per invocation
    max_rounds: u32,

    temperature: Option<f32>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            provider,
            tools,
            system_prompt: Arc::from(DEFAULT_SYSTEM_PROMPT),
            max_rounds: DEFAULT_MAX_ROUNDS,
            temperature: None,
        }
    }

    /// Replace the default system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Arc::from(prompt.into());
        self
    }

    /// Set the maximum number of rounds per invocation.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one invocation over `messages` with `model`.
    ///
    /// Nothing happens until the returned stream is polled. The caller's
    /// messages are copied in; the invocation owns its conversation.
    pub fn run(&self, messages: impl Into<Conversation>, model: impl Into<String>) -> AgentStream {
        let agent = self.clone();
        let mut conversation: Conversation = messages.into();
        let model: String = model.into();

        Box::pin(async_stream::try_stream! {
            conversation.ensure_system_prompt(&agent.system_prompt);
            let definitions = agent.tools.definitions();

            info!(
                provider = agent.provider.name(),
                model = %model,
                messages = conversation.len(),
                "Starting agent invocation"
            );

            let mut round: u32 = 0;
            loop {
                round += 1;
                if round > agent.max_rounds {
                    warn!(
                        max_rounds = agent.max_rounds,
                        "Max rounds reached, ending invocation"
                    );
                    break;
                }

                debug!(round, messages = conversation.len(), "Agent loop round");

                let request = ProviderRequest {
                    model: model.clone(),
                    messages: conversation.messages().to_vec(),
                    temperature: agent.temperature,
                    tools: definitions.clone(),
                };

                let mut chunks = agent.provider.stream(request).await?;
                let mut pending = PendingToolCalls::new();
                let mut finish_reason: Option<FinishReason> = None;

                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;

                    if let Some(delta) = chunk.content.filter(|d| !d.is_empty()) {
                        yield emit(AgentEvent::ContentDelta { delta });
                    }

                    pending.apply(&chunk.tool_calls);

                    if let Some(reason) = chunk.finish_reason {
                        finish_reason = Some(reason);
                    }

                    if let Some(usage) = chunk.usage {
                        debug!(
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            total_tokens = usage.total_tokens,
                            "Token usage"
                        );
                    }
                }

                let wants_tools = finish_reason
                    .as_ref()
                    .is_some_and(FinishReason::requests_tools);
                if !wants_tools || pending.is_empty() {
                    debug!(round, finish_reason = ?finish_reason, "Model finished");
                    break;
                }

                let calls = pending.into_calls();
                debug!(round, tool_count = calls.len(), "Executing tool calls");

                let mut results: Vec<ToolResult> = Vec::with_capacity(calls.len());
                for call in &calls {
                    let name = call.name.clone();

                    match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                        Err(e) => {
                            let reason = format!("Invalid JSON arguments: {e}");
                            warn!(id = %call.id, tool = ?name, %reason, "Skipping malformed tool call");

                            yield emit(AgentEvent::ToolCallStart {
                                id: call.id.clone(),
                                name,
                                arguments: serde_json::json!({}),
                                error: Some(reason.clone()),
                            });

                            let result = ToolResult::error(call.id.clone(), &reason);
                            yield emit(result_event(&result));
                            results.push(result);
                        }
                        Ok(arguments) => {
                            yield emit(AgentEvent::ToolCallStart {
                                id: call.id.clone(),
                                name: name.clone(),
                                arguments: arguments.clone(),
                                error: None,
                            });

                            let output = agent
                                .tools
                                .execute(name.as_deref().unwrap_or_default(), arguments)
                                .await;
                            let result = ToolResult::from_output(call.id.clone(), output);
                            yield emit(result_event(&result));
                            results.push(result);
                        }
                    }
                }

                conversation.push(Message::assistant_tool_calls(
                    calls.iter().map(PendingToolCall::to_message_call).collect(),
                ));
                conversation.extend(
                    results
                        .into_iter()
                        .map(|r| Message::tool_result(r.call_id, r.output)),
                );
            }

            yield emit(AgentEvent::Done {});
        })
    }
}

fn result_event(result: &ToolResult) -> AgentEvent {
    AgentEvent::ToolCallResult {
        id: result.call_id.clone(),
        result: result.output.clone(),
        is_error: result.is_error,
    }
}

/// Log an outgoing event under the SSE target.
fn emit(event: AgentEvent) -> AgentEvent {
    debug!(target: "toolloop::sse", event = event.event_type(), payload = ?event, "Emitting event");
    event
}
