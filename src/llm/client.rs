//! HTTP client for the chat-completions endpoint.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::RelayError;
use crate::llm::types::{ChatCompletionResponse, ChatRequest, Message};
use crate::tools::registry::ToolSpec;

const CONTEXT: &str = "LLM request";

/// Client for `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    endpoint: String,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, RelayError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// System prompt, then `history`, then the user's prompt.
    pub fn conversation(&self, history: Vec<Message>, prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.config.system_prompt.clone()));
        messages.extend(history);
        messages.push(Message::user(prompt));
        messages
    }

    pub fn request(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<ToolSpec>>,
        stream: bool,
    ) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            stream,
            tools,
        }
    }

    /// Send a non-streaming request and decode the whole response.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletionResponse, RelayError> {
        debug!(
            model = request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending completion request"
        );

        let deadline = self.config.request_timeout();
        let transport = |e: reqwest::Error| RelayError::transport(e, CONTEXT, deadline);
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .timeout(deadline)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response)?;

        let body = response.bytes().await.map_err(transport)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Open a streaming request. The caller reads the body; only connecting
    /// and receiving the status line are bounded by the request deadline.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<Response, RelayError> {
        debug!(model = request.model, "Opening completion stream");

        let deadline = self.config.request_timeout();
        let send = self.http.post(&self.endpoint).json(request).send();
        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| timeout(deadline))?
            .map_err(|e| RelayError::transport(e, CONTEXT, deadline))?;
        check_status(response)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        self.config.stream_idle_timeout()
    }
}

fn check_status(response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RelayError::UpstreamStatus {
            context: CONTEXT,
            status,
        })
    }
}

pub(crate) fn timeout(deadline: Duration) -> RelayError {
    RelayError::Timeout(CONTEXT, deadline.as_secs())
}
