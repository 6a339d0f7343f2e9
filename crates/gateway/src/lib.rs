//! HTTP API gateway for toolloop.
//!
//! - `POST /api/chat`   - run the agent, streaming its events as SSE
//! - `GET  /api/health` - liveness and configuration check
//!
//! Built on Axum. The provider, tools, and agent are built once at startup
//! and shared by every request.

pub mod schemas;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{
        Json,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use toolloop_agent::{AgentEvent, AgentLoop};
use toolloop_config::AppConfig;
use toolloop_core::error::Error;
use toolloop_core::message::{Conversation, Message};
use toolloop_providers::OpenAiCompatProvider;
use toolloop_tools::WorkspaceTools;

use schemas::{ChatRequest, ErrorResponse, HealthResponse};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: AgentLoop,
    pub default_model: String,
    pub cors_origins: Vec<String>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the agent from configuration: provider, workspace tools, limits.
///
/// Fails when no API key is configured or the workspace cannot be opened.
pub fn build_agent(config: &AppConfig) -> Result<AgentLoop, Error> {
    let provider = OpenAiCompatProvider::from_config(config)?;
    let tools = WorkspaceTools::open(&config.workspace.root).map_err(|e| Error::Config {
        message: e.to_string(),
    })?;

    info!(
        provider = "openai",
        base_url = %provider.base_url(),
        workspace = %tools.sandbox().root().display(),
        "Agent subsystems ready"
    );

    let mut agent = AgentLoop::new(Arc::new(provider), Arc::new(tools))
        .with_max_rounds(config.agent.max_rounds)
        .with_temperature(config.temperature);
    if let Some(prompt) = &config.agent.system_prompt {
        agent = agent.with_system_prompt(prompt.clone());
    }
    Ok(agent)
}

/// Build the shared state from configuration.
pub fn build_state(config: &AppConfig) -> Result<SharedState, Error> {
    Ok(Arc::new(GatewayState {
        agent: build_agent(config)?,
        default_model: config.default_model.clone(),
        cors_origins: config.gateway.cors_origins.clone(),
    }))
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let origins: Vec<HeaderValue> = state
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config)?;
    let app = build_router(state);

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.agent.provider_name().to_string(),
        default_model: state.default_model.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn bad_request(error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// `POST /api/chat` - run one agent invocation, one SSE event per agent event.
///
/// A fatal endpoint failure ends the stream with an `error` event.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<
    Sse<impl Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    let messages: Vec<Message> = payload.messages.into_iter().map(Message::from).collect();
    let conversation = Conversation::from(messages);
    conversation
        .validate_tool_links()
        .map_err(|e| bad_request(e.to_string()))?;

    let model = payload
        .model
        .unwrap_or_else(|| state.default_model.clone());
    let request_id = uuid::Uuid::new_v4();
    info!(%request_id, messages = conversation.len(), model = %model, "Chat request");

    let stream = state.agent.run(conversation, model).map(move |item| {
        let event = match item {
            Ok(event) => to_sse(&event),
            Err(e) => {
                warn!(%request_id, error = %e, "Agent invocation failed");
                SseEvent::default()
                    .event("error")
                    .data(serde_json::json!({ "message": e.to_string() }).to_string())
            }
        };
        Ok(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &AgentEvent) -> SseEvent {
    let data = serde_json::to_string(event).unwrap_or_default();
    SseEvent::default().event(event.event_type()).data(data)
}
