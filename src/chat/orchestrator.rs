//! Completion orchestrator: one non-streaming run per prompt.
//!
//! BUILD_REQUEST → SEND → {PLAIN_REPLY | TOOL_CALL} → [DISPATCH_TOOL] →
//! [SUMMARIZE] → DONE. Every failure becomes an `{"error": ...}` outcome.

use std::sync::Arc;

use prometheus::IntCounterVec;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::session::SessionStore;
use crate::error::RelayError;
use crate::llm::client::LlmClient;
use crate::llm::types::{Message, ToolCallRequest};
use crate::tools::dispatch::dispatch;
use crate::tools::registry::ToolRegistry;
use crate::tools::ToolResult;

/// Final answer for a prompt, serialized as the HTTP response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompletionOutcome {
    Reply { content: String },
    Tool(ToolResult),
    Error { error: String },
}

impl CompletionOutcome {
    /// Assistant text recorded in session history for successful outcomes.
    fn answer_text(&self) -> Option<String> {
        match self {
            Self::Reply { content } => Some(content.clone()),
            Self::Tool(result) if !result.is_error() => Some(result.to_json_string()),
            _ => None,
        }
    }
}

/// Whether the tool catalog is advertised to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Enabled,
    Disabled,
}

pub struct CompletionOrchestrator {
    llm: LlmClient,
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    /// Dispatched tool calls by `tool` and `outcome` (`ok` / `error`).
    tool_calls: IntCounterVec,
}

impl CompletionOrchestrator {
    pub fn new(
        llm: LlmClient,
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        tool_calls: IntCounterVec,
    ) -> Self {
        Self {
            llm,
            registry,
            sessions,
            tool_calls,
        }
    }

    /// Run one prompt to completion.
    ///
    /// With a `session_id`, earlier turns of that session are replayed and
    /// this turn is appended on success.
    pub async fn complete(
        &self,
        prompt: &str,
        tools: ToolMode,
        session_id: Option<&str>,
    ) -> CompletionOutcome {
        let request_id = Uuid::new_v4().to_string();
        info!(
            request_id,
            tools = ?tools,
            session = session_id.unwrap_or("-"),
            "Completion request"
        );

        match self.run(prompt, tools, session_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(request_id, "Completion failed: {e}");
                CompletionOutcome::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run(
        &self,
        prompt: &str,
        tools: ToolMode,
        session_id: Option<&str>,
    ) -> Result<CompletionOutcome, RelayError> {
        let history = match session_id {
            Some(id) => self.sessions.history(id).await,
            None => Vec::new(),
        };
        let messages = self.llm.conversation(history, prompt);
        let specs = match tools {
            ToolMode::Enabled => Some(self.registry.tool_specs()),
            ToolMode::Disabled => None,
        };

        let request = self.llm.request(messages.clone(), specs, false);
        let response = self.llm.complete(&request).await?;
        let message = response.first_message().ok_or(RelayError::EmptyResponse)?;

        let outcome = match (&message.tool_calls, &message.content) {
            (Some(calls), _) if !calls.is_empty() => {
                self.dispatch_first(messages, calls, session_id).await?
            }
            (_, Some(content)) if !content.is_empty() => CompletionOutcome::Reply {
                content: content.clone(),
            },
            _ => return Err(RelayError::EmptyResponse),
        };

        if let (Some(id), Some(answer)) = (session_id, outcome.answer_text()) {
            self.sessions.append_turn(id, prompt, &answer).await;
        }
        Ok(outcome)
    }

    /// Only the first call is honored.
    async fn dispatch_first(
        &self,
        mut messages: Vec<Message>,
        calls: &[ToolCallRequest],
        session_id: Option<&str>,
    ) -> Result<CompletionOutcome, RelayError> {
        if calls.len() > 1 {
            warn!(
                requested = calls.len(),
                "Model requested several tool calls; dispatching the first only"
            );
        }
        let call = &calls[0];
        let result = dispatch(&self.registry, call).await;
        self.record_tool_call(call, &result);

        if let Some(id) = session_id {
            self.sessions
                .update_context(id, "last_tool", json!(call.function.name))
                .await;
            self.sessions
                .update_context(
                    id,
                    "last_tool_result",
                    serde_json::to_value(&result).unwrap_or(Value::Null),
                )
                .await;
        }

        if !self.llm.config().summarize_tool_results || result.is_error() {
            return Ok(CompletionOutcome::Tool(result));
        }

        messages.push(Message::assistant_tool_calls(vec![call.clone()]));
        messages.push(Message::tool(call.id.clone(), result.to_json_string()));

        let request = self.llm.request(messages, None, false);
        let response = self.llm.complete(&request).await?;
        response
            .first_message()
            .and_then(|m| m.content.clone())
            .filter(|content| !content.is_empty())
            .map(|content| CompletionOutcome::Reply { content })
            .ok_or(RelayError::EmptyResponse)
    }

    fn record_tool_call(&self, call: &ToolCallRequest, result: &ToolResult) {
        let tool = match call.function.name.as_deref() {
            Some(name) if self.registry.get(name).is_some() => name,
            _ => "unknown",
        };
        let outcome = if result.is_error() { "error" } else { "ok" };
        self.tool_calls.with_label_values(&[tool, outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::FunctionCall;

    #[test]
    fn test_outcome_bodies() {
        let reply = CompletionOutcome::Reply {
            content: "hello".to_string(),
        };
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"content": "hello"}));
        assert_eq!(reply.answer_text().as_deref(), Some("hello"));

        let tool = CompletionOutcome::Tool(ToolResult::Content(json!({"flights": []})));
        assert_eq!(serde_json::to_value(&tool).unwrap(), json!({"flights": []}));

        let failed = CompletionOutcome::Tool(ToolResult::error("unknown tool"));
        assert_eq!(failed.answer_text(), None);
    }

    fn tool_call_counter() -> IntCounterVec {
        IntCounterVec::new(
            prometheus::Opts::new("tool_calls_total", "Tool calls"),
            &["tool", "outcome"],
        )
        .unwrap()
    }

    fn orchestrator(base_url: &str) -> CompletionOrchestrator {
        let llm = LlmClient::new(crate::config::LlmConfig {
            base_url: base_url.to_string(),
            connect_timeout_secs: 1,
            request_timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        CompletionOrchestrator::new(
            llm,
            Arc::new(ToolRegistry::new()),
            Arc::new(SessionStore::new(10, 10)),
            tool_call_counter(),
        )
    }

    #[test]
    fn test_unregistered_tool_calls_are_counted_as_unknown() {
        let orchestrator = orchestrator("http://127.0.0.1:9");
        let call = ToolCallRequest::new(
            "c1",
            FunctionCall {
                name: Some("book_hotel".to_string()),
                arguments: json!({}),
            },
        );
        orchestrator.record_tool_call(&call, &ToolResult::error("unknown tool"));

        assert_eq!(
            orchestrator
                .tool_calls
                .with_label_values(&["unknown", "error"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_unreachable_llm_yields_error_value() {
        let orchestrator = orchestrator("http://127.0.0.1:9");

        let outcome = orchestrator
            .complete("hi", ToolMode::Disabled, Some("s1"))
            .await;
        assert!(matches!(outcome, CompletionOutcome::Error { .. }));
        assert!(orchestrator.sessions.history("s1").await.is_empty());
    }
}
