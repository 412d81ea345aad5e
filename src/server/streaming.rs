//! SSE (Server-Sent Events) framing for the streaming relay.
//!
//! Each StreamEvent becomes one `data: <json>\n\n` frame.

use axum::response::sse::Event;
use futures::stream::Stream;
use prometheus::IntCounterVec;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::chat::event::StreamEvent;

/// Convert a relay event receiver into an SSE stream, counting events by kind.
pub fn events_to_sse_stream(
    rx: mpsc::Receiver<StreamEvent>,
    counter: IntCounterVec,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    ReceiverStream::new(rx).map(move |event| {
        counter.with_label_values(&[event.kind()]).inc();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(Event::default().data(data))
    })
}
