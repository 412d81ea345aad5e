//! Streaming relay: upstream token stream → ordered StreamEvents.
//!
//! Events flow through a bounded channel. Exactly one terminal event
//! (`complete` or `error`) ends every stream. Once the receiver is dropped
//! the producer stops, even while waiting on the upstream, and the
//! upstream connection is released.

use std::fmt::Display;
use std::pin::pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::event::StreamEvent;
use crate::error::RelayError;
use crate::llm::client::LlmClient;
use crate::llm::sse::{parse_line, LineDecoder, LineEvent};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Clone)]
pub struct StreamingRelay {
    llm: LlmClient,
}

impl StreamingRelay {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Start streaming a completion for `prompt` (system + user message,
    /// no tools). Each call opens a new upstream request.
    pub fn stream_completion(&self, prompt: &str) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let llm = self.llm.clone();
        let request = llm.request(llm.conversation(Vec::new(), prompt), None, true);

        tokio::spawn(async move {
            info!(model = request.model, "Starting stream");
            let response = match llm.open_stream(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Stream could not be opened: {e}");
                    let _ = tx.send(StreamEvent::error(e.to_string())).await;
                    return;
                }
            };
            relay_body(response.bytes_stream(), llm.stream_idle_timeout(), tx).await;
        });

        rx
    }
}

enum Flow {
    Continue,
    Stop,
    Closed,
}

/// Forward tokens from an upstream body until `[DONE]`, a finish reason,
/// EOF, a read error or `idle` without data, then send the terminal event.
pub async fn relay_body<S, B, E>(body: S, idle: Duration, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut body = pin!(body);
    let mut decoder = LineDecoder::new();
    let mut tokens = 0usize;

    let terminal = 'read: loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(tokens, "Client went away, dropping upstream stream");
                return;
            }
            next = tokio::time::timeout(idle, body.next()) => next,
        };
        let chunk = match next {
            Err(_) => {
                break StreamEvent::error(RelayError::Timeout("LLM stream", idle.as_secs()).to_string());
            }
            Ok(None) => {
                if let Some(line) = decoder.finish() {
                    if let Flow::Closed = forward(&line, &tx, &mut tokens).await {
                        return;
                    }
                }
                break StreamEvent::complete();
            }
            Ok(Some(Err(e))) => break StreamEvent::error(e.to_string()),
            Ok(Some(Ok(chunk))) => chunk,
        };

        for line in decoder.push(chunk.as_ref()) {
            match forward(&line, &tx, &mut tokens).await {
                Flow::Continue => {}
                Flow::Stop => break 'read StreamEvent::complete(),
                Flow::Closed => {
                    debug!(tokens, "Client went away, dropping upstream stream");
                    return;
                }
            }
        }
    };

    if let StreamEvent::Error { error } = &terminal {
        warn!(tokens, "Stream failed: {error}");
    } else {
        info!(tokens, "Stream complete");
    }
    let _ = tx.send(terminal).await;
}

async fn forward(line: &str, tx: &mpsc::Sender<StreamEvent>, tokens: &mut usize) -> Flow {
    match parse_line(line) {
        LineEvent::Skip => Flow::Continue,
        LineEvent::Done => Flow::Stop,
        LineEvent::Chunk { token, finished } => {
            if let Some(token) = token {
                *tokens += 1;
                if tx.send(StreamEvent::token(token)).await.is_err() {
                    return Flow::Closed;
                }
            }
            if finished {
                Flow::Stop
            } else {
                Flow::Continue
            }
        }
    }
}
