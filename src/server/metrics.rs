//! Prometheus counters exposed on `/metrics`.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct RelayMetrics {
    registry: Registry,
    /// Inbound requests by route.
    pub requests: IntCounterVec,
    /// Dispatched tool calls by tool and outcome (`ok` / `error`).
    pub tool_calls: IntCounterVec,
    /// SSE events sent by kind (`token` / `complete` / `error`).
    pub stream_events: IntCounterVec,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("relay_requests_total", "Inbound chat requests"),
            &["route"],
        )?;
        let tool_calls = IntCounterVec::new(
            Opts::new("relay_tool_calls_total", "Tool calls dispatched"),
            &["tool", "outcome"],
        )?;
        let stream_events = IntCounterVec::new(
            Opts::new("relay_stream_events_total", "SSE events emitted"),
            &["kind"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(tool_calls.clone()))?;
        registry.register(Box::new(stream_events.clone()))?;

        Ok(Self {
            registry,
            requests,
            tool_calls,
            stream_events,
        })
    }

    /// Text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {e}");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
