//! Line framing for the upstream streaming response.
//!
//! The upstream sends `data: <json>` lines separated by blank lines and
//! ends with `data: [DONE]`. Bytes arrive in arbitrary chunks, so lines
//! are reassembled before parsing.

use bytes::{Buf, BytesMut};
use serde_json::Value;

/// Splits a byte stream into `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Unterminated trailing line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = self.buffer.split();
        Some(decode_line(&line))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// What a single upstream line means for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Blank, non-`data:`, or undecodable line.
    Skip,
    /// A decoded chunk. `finished` is set when the choice carried a
    /// `finish_reason`.
    Chunk {
        token: Option<String>,
        finished: bool,
    },
    /// The `[DONE]` sentinel.
    Done,
}

pub fn parse_line(line: &str) -> LineEvent {
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        return LineEvent::Skip;
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return LineEvent::Done;
    }

    // Read field by field: a mistyped sibling field never drops the token.
    let Ok(chunk) = serde_json::from_str::<Value>(payload) else {
        return LineEvent::Skip;
    };
    let Some(choice) = chunk.pointer("/choices/0").filter(|c| c.is_object()) else {
        return LineEvent::Skip;
    };

    LineEvent::Chunk {
        token: choice
            .pointer("/delta/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        finished: choice
            .get("finish_reason")
            .is_some_and(|reason| !reason.is_null()),
    }
}
