//! Stub upstreams and request helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use chat_relay::config::{Config, LlmConfig, ToolsConfig};
use chat_relay::server::api::{build_router, AppState};

/// Serve `app` on an ephemeral localhost port, returning its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn config(llm_base: &str, tools_base: &str) -> Config {
    Config {
        llm: LlmConfig {
            base_url: llm_base.to_string(),
            model: "stub-model".to_string(),
            request_timeout_secs: 5,
            stream_idle_timeout_secs: 5,
            ..LlmConfig::default()
        },
        tools: ToolsConfig {
            base_url: tools_base.to_string(),
            request_timeout_secs: 5,
        },
        ..Config::default()
    }
}

pub fn relay_router(config: Config) -> Router {
    let state = AppState::new(Arc::new(config)).unwrap();
    build_router(Arc::new(state))
}

/// POST a JSON body and return status plus raw body text.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// GET `uri` and return status plus raw body text.
pub async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Split an SSE body into its JSON payloads.
pub fn sse_payloads(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

// ─── Stub LLM ──────────────────────────────────────────────────────────────

/// Every request body the stub LLM received.
pub type Seen = Arc<Mutex<Vec<Value>>>;

/// LLM that answers every request with a fixed streaming body.
pub fn streaming_llm(body: &'static str) -> Router {
    Router::new().route(
        "/chat/completions",
        post(move || async move { ([(header::CONTENT_TYPE, "text/event-stream")], body) }),
    )
}

/// LLM that always fails with `status`.
pub fn failing_llm(status: StatusCode) -> Router {
    Router::new().route(
        "/chat/completions",
        post(move || async move { (status, "upstream unavailable") }),
    )
}

pub fn completion(message: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
    })
}

/// LLM for one-shot requests:
/// - a `tool` message in the conversation → a summary reply
/// - tools advertised → a `search_flights` call for Paris → Tokyo
/// - otherwise → "messages=<n>" so tests can observe history replay
pub fn tool_calling_llm(seen: Seen) -> Router {
    async fn handler(State(seen): State<Seen>, Json(body): Json<Value>) -> impl IntoResponse {
        seen.lock().unwrap().push(body.clone());

        let messages = body["messages"].as_array().cloned().unwrap_or_default();
        if messages.iter().any(|m| m["role"] == "tool") {
            return Json(completion(json!({
                "role": "assistant",
                "content": "The cheapest flight costs 420."
            })));
        }
        if body.get("tools").is_some() {
            return Json(completion(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "search_flights",
                        "arguments": "{\"source\":\"Paris\",\"destination\":\"Tokyo\",\"departure_date\":\"01 Jun, 2025\"}"
                    }
                }]
            })));
        }
        Json(completion(json!({
            "role": "assistant",
            "content": format!("messages={}", messages.len())
        })))
    }

    Router::new()
        .route("/chat/completions", post(handler))
        .with_state(seen)
}

/// LLM that answers with a fixed completion message.
pub fn fixed_llm(message: Value) -> Router {
    Router::new().route(
        "/chat/completions",
        post(move || {
            let message = message.clone();
            async move { Json(completion(message)) }
        }),
    )
}

// ─── Stub flight API ───────────────────────────────────────────────────────

/// Autocomplete labels every term as `<TERM>_LBL` except "Nowhereland"
/// (empty list), "Broken" (500) and "Slow" (answers after 5s). Search echoes its query next to a fixed
/// price list, and fails with 500 when the date is "bad".
pub fn flight_api() -> Router {
    async fn autocomplete(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
        let term = q.get("term").cloned().unwrap_or_default();
        if term == "Slow" {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
        match term.as_str() {
            "Nowhereland" => (StatusCode::OK, Json(json!([]))),
            "Broken" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "down"}))),
            "Unlabeled" => (StatusCode::OK, Json(json!([{"id": 7}]))),
            _ => {
                assert_eq!(q.get("payment_method_int").map(String::as_str), Some("1"));
                (
                    StatusCode::OK,
                    Json(json!([
                        {"label": format!("{}_LBL", term.to_uppercase()), "id": 1},
                        {"label": "second", "id": 2}
                    ])),
                )
            }
        }
    }

    async fn search(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
        if q.get("date").map(String::as_str) == Some("bad") {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "bad date"})));
        }
        (
            StatusCode::OK,
            Json(json!({
                "query": {"src": q["src"], "dest": q["dest"], "date": q["date"]},
                "prices": [420, 515, 780]
            })),
        )
    }

    Router::new()
        .route("/autocomplete", get(autocomplete))
        .route("/search", get(search))
}
