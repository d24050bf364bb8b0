//! Server-Sent Events support

use crate::projection::RenderEntry;
use crate::session::{PurchaseDisplay, SessionEvent, UiFrame, UiStream};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Live projection of a session: `init` with the current entries, then
/// one `entries` event per append and `error` events for failed turns
pub fn sse_stream(
    conversation_id: String,
    init_entries: Vec<RenderEntry>,
    broadcast_rx: tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        Ok(Event::default().event("init").data(
            json!({
                "type": "init",
                "conversation_id": conversation_id,
                "entries": init_entries
            })
            .to_string(),
        ))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(session_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn session_event_to_axum(event: SessionEvent) -> Event {
    let (event_type, data) = match event {
        SessionEvent::Entries { entries } => (
            "entries",
            json!({
                "type": "entries",
                "entries": entries
            }),
        ),
        SessionEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}

/// Purchase progress: `update` events, then one `done` event
pub fn purchase_stream(
    progress: UiStream<PurchaseDisplay>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(progress.map(|frame| Ok(purchase_frame_to_axum(&frame))))
}

fn purchase_frame_to_axum(frame: &UiFrame<PurchaseDisplay>) -> Event {
    let event_type = if frame.is_done() { "done" } else { "update" };
    let display = frame.value();
    let data = json!({
        "type": event_type,
        "display": display,
        "message": display.message()
    });
    Event::default().event(event_type).data(data.to_string())
}
