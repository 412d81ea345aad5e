//! HTTP API consumed by the web client.
//!
//! - GET  /api/health
//! - POST /api/chat             (SSE stream)
//! - POST /api/chat/tools       (one-shot, tools advertised)
//! - POST /api/chat/completion  (one-shot, no tools)
//! - GET  /metrics

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::orchestrator::{CompletionOrchestrator, CompletionOutcome, ToolMode};
use crate::chat::relay::StreamingRelay;
use crate::chat::session::SessionStore;
use crate::config::Config;
use crate::llm::client::LlmClient;
use crate::server::metrics::RelayMetrics;
use crate::server::streaming::events_to_sse_stream;
use crate::tools::flight::{FlightApi, SearchFlightsTool};
use crate::tools::registry::ToolRegistry;

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: CompletionOrchestrator,
    pub relay: StreamingRelay,
    pub metrics: RelayMetrics,
}

impl AppState {
    /// State with the default tool catalog (`search_flights`).
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let flights = FlightApi::new(&config.tools)?;
        let registry = ToolRegistry::new().with(SearchFlightsTool::new(flights));
        Self::with_registry(config, Arc::new(registry))
    }

    pub fn with_registry(config: Arc<Config>, registry: Arc<ToolRegistry>) -> anyhow::Result<Self> {
        let llm = LlmClient::new(config.llm.clone())?;
        let sessions = Arc::new(SessionStore::new(
            config.llm.history_limit,
            config.llm.max_sessions,
        ));

        let metrics = RelayMetrics::new()?;

        Ok(Self {
            orchestrator: CompletionOrchestrator::new(
                llm.clone(),
                registry,
                sessions,
                metrics.tool_calls.clone(),
            ),
            relay: StreamingRelay::new(llm),
            metrics,
            config,
        })
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/tools", post(chat_tools))
        .route("/api/chat/completion", post(chat_completion))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Body of every chat route.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
    /// Opt-in conversation history for the one-shot routes.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A rejected request, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

fn validate(payload: Result<Json<PromptRequest>, JsonRejection>) -> Result<PromptRequest, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if request.prompt.is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }
    Ok(request)
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state.metrics.requests.with_label_values(&["chat"]).inc();
    let request = validate(payload)?;

    info!(prompt_chars = request.prompt.len(), "Streaming chat request");

    let rx = state.relay.stream_completion(&request.prompt);
    let stream = events_to_sse_stream(rx, state.metrics.stream_events.clone());
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn chat_tools(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<CompletionOutcome>, ApiError> {
    complete(&state, payload, ToolMode::Enabled, "chat_tools").await
}

async fn chat_completion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<CompletionOutcome>, ApiError> {
    complete(&state, payload, ToolMode::Disabled, "chat_completion").await
}

async fn complete(
    state: &AppState,
    payload: Result<Json<PromptRequest>, JsonRejection>,
    tools: ToolMode,
    route: &str,
) -> Result<Json<CompletionOutcome>, ApiError> {
    state.metrics.requests.with_label_values(&[route]).inc();
    let request = validate(payload)?;

    let outcome = state
        .orchestrator
        .complete(&request.prompt, tools, request.session_id.as_deref())
        .await;

    Ok(Json(outcome))
}

async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.encode()
}
