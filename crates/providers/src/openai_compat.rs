//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing a streaming
//! `/chat/completions` route with function calling (vLLM, Ollama,
//! OpenRouter, intercepting proxies).
//!
//! The response is decoded from SSE into raw [`StreamChunk`]s. Tool-call
//! fragments are passed through untouched; assembling them is the agent's
//! job.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use toolloop_config::AppConfig;
use toolloop_core::error::ProviderError;
use toolloop_core::message::{Message, Role};
use toolloop_core::provider::*;
use tracing::{debug, trace, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// An OpenAI-compatible LLM provider.
///
/// Holds one `reqwest::Client`, which is safe to share across concurrent
/// agent invocations.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider with default client settings.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS), false)?;
        Ok(Self::with_client(name, base_url, api_key, client))
    }

    /// Create a provider around an already configured HTTP client.
    pub fn with_client(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Build the process-wide provider from configuration.
    ///
    /// Fails fast with `NotConfigured` when no API key is available.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "no API key: set OPENAI_API_KEY or api_key in config.toml".into(),
                )
            })?;

        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for the model endpoint");
        }

        let client = http_client(
            Duration::from_secs(config.request_timeout_secs),
            config.accept_invalid_certs,
        )?;

        Ok(Self::with_client("openai", &config.base_url, api_key, client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The JSON body of a streaming chat-completions request.
    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: m.content.clone(),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

fn http_client(timeout: Duration, accept_invalid_certs: bool) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("failed to build HTTP client: {e}")))
}

/// Map a non-200 status to the provider error taxonomy.
fn status_to_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited { retry_after_secs: 5 },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// The payload of an SSE `data:` line, if this is one.
fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Why an SSE payload produced no chunk.
#[derive(Debug)]
enum FrameError {
    /// Not a chat-completion frame; skipped.
    Unparseable(serde_json::Error),
    /// The endpoint reported a failure in-band; fatal.
    Reported(ProviderError),
}

/// Decode one SSE payload. `Ok(None)` means the frame carried nothing.
///
/// Only the first choice is consulted.
fn decode_frame(data: &str) -> Result<Option<StreamChunk>, FrameError> {
    let frame: StreamResponse = serde_json::from_str(data).map_err(FrameError::Unparseable)?;

    if let Some(error) = frame.error {
        return Err(FrameError::Reported(ProviderError::StreamError(
            error_message(&error),
        )));
    }

    let usage = frame.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let Some(choice) = frame.choices.into_iter().next() else {
        return Ok(usage.map(|usage| StreamChunk {
            usage: Some(usage),
            ..StreamChunk::default()
        }));
    };

    let tool_calls = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let (name, arguments) = match tc.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };
            ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            }
        })
        .collect();

    Ok(Some(StreamChunk {
        content: choice.delta.content,
        tool_calls,
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        usage,
    }))
}

/// What one SSE line means for the chunk stream.
enum Line {
    Skip,
    Chunk(StreamChunk),
    Done,
    Failed(ProviderError),
}

fn read_line(provider_name: &str, raw: &[u8]) -> Line {
    let line = String::from_utf8_lossy(raw);
    let Some(data) = sse_data(line.trim()) else {
        return Line::Skip;
    };

    if data == "[DONE]" {
        return Line::Done;
    }

    match decode_frame(data) {
        Ok(Some(chunk)) => Line::Chunk(chunk),
        Ok(None) => Line::Skip,
        Err(FrameError::Reported(err)) => {
            warn!(provider = %provider_name, error = %err, "Provider sent an error frame");
            Line::Failed(err)
        }
        Err(FrameError::Unparseable(e)) => {
            trace!(
                provider = %provider_name,
                data = %data,
                error = %e,
                "Ignoring unparseable SSE chunk"
            );
            Line::Skip
        }
    }
}

/// Text of an in-band `error` object (or bare string).
fn error_message(error: &serde_json::Value) -> String {
    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());

    match error.get("type").and_then(serde_json::Value::as_str) {
        Some(kind) => format!("{message} ({kind})"),
        None => message,
    }
}

#[async_trait]
impl toolloop_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(status_to_error(status, error_body));
        }

        let provider_name = self.name.clone();
        let byte_stream = response.bytes_stream();

        let stream = async_stream::stream! {
            futures::pin_mut!(byte_stream);
            let mut buffer: Vec<u8> = Vec::new();
            let mut body_ended = false;

            loop {
                match byte_stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        yield Err(ProviderError::StreamInterrupted(e.to_string()));
                        return;
                    }
                    // A last line without its newline is still a line.
                    None if buffer.is_empty() => break,
                    None => {
                        buffer.push(b'\n');
                        body_ended = true;
                    }
                }

                // Split on raw bytes so multi-byte characters spanning
                // network chunks are decoded whole.
                while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    match read_line(&provider_name, &raw) {
                        Line::Skip => {}
                        Line::Chunk(chunk) => yield Ok(chunk),
                        Line::Done => {
                            trace!(provider = %provider_name, "Stream complete");
                            return;
                        }
                        Line::Failed(err) => {
                            yield Err(err);
                            return;
                        }
                    }
                }

                if body_ended {
                    break;
                }
            }

            warn!(provider = %provider_name, "Stream ended without [DONE]");
            yield Err(ProviderError::StreamInterrupted(
                "response ended before [DONE]".into(),
            ));
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta - arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
