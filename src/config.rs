//! Runtime configuration for chat-relay.
//!
//! Configuration is loaded once from a JSON file (every field defaulted),
//! then overridden from the environment. It is immutable after startup.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-relay", about = "LLM chat relay with flight-search tool calling")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file and PORT).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// LLM upstream configuration.
    pub llm: LlmConfig,

    /// Tool upstream configuration.
    pub tools: ToolsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:5010").
    pub listen: String,

    /// Debug mode: raises the default log level.
    pub debug: bool,

    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5010".to_string(),
            debug: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Chat-completions upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL; requests go to `{base_url}/chat/completions`.
    pub base_url: String,

    /// Model name sent with every request.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// System prompt placed first in every request.
    pub system_prompt: String,

    /// Feed tool results back to the LLM for a natural-language answer.
    pub summarize_tool_results: bool,

    /// Maximum number of history messages replayed per session.
    pub history_limit: usize,

    /// Maximum number of sessions kept; the least recently used is evicted.
    pub max_sessions: usize,

    pub connect_timeout_secs: u64,

    /// Deadline for non-streaming calls and for opening a stream.
    pub request_timeout_secs: u64,

    /// Deadline between two reads of a streaming response.
    pub stream_idle_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.7,
            system_prompt: "You are a helpful assistant.".to_string(),
            summarize_tool_results: false,
            history_limit: 20,
            max_sessions: 1000,
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
            stream_idle_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

/// External tool API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Base URL of the autocomplete/search API.
    pub base_url: String,

    /// Deadline for each outbound tool call.
    pub request_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ToolsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields
    /// (or a missing file), then apply environment overrides.
    ///
    /// Runs before logging is initialized, so it does not log.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str::<Config>(&data)?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `LLM_BASE_URL`, `MODEL_NAME`, `TEMPERATURE`,
    /// `SERVER_BASE_URL`, `PORT` and `DEBUG`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(temperature) = lookup("TEMPERATURE") {
            self.llm.temperature = temperature
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid TEMPERATURE {temperature:?}: {e}"))?;
        }
        if let Some(url) = lookup("SERVER_BASE_URL") {
            self.tools.base_url = url;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {port:?}: {e}"))?;
            let host = self
                .server
                .listen
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.listen = format!("{host}:{port}");
        }
        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = matches!(debug.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }
}
