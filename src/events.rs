//! Live updates for open feedback pages.
//!
//! Handlers publish a [`SpaceEvent`] after each successful write; every
//! `GET /s/{slug}/events` connection holds a broadcast receiver and forwards
//! the events of its own space as server-sent events.

use std::{convert::Infallible, fmt};

use axum::response::{
    sse::{Event, KeepAlive, Sse},
    IntoResponse,
};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Events buffered per subscriber before it starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A question with its choices.
    Question,
    Answer,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Question => "question",
            EventKind::Answer => "answer",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SpaceEvent {
    pub space_id: String,
    pub kind: EventKind,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct Events {
    sender: broadcast::Sender<SpaceEvent>,
}

impl Events {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: SpaceEvent) {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => debug!(%kind, receivers, "event published"),
            // Nobody has the page open.
            Err(_) => debug!(%kind, "event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpaceEvent> {
        self.sender.subscribe()
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

/// Server-sent event stream of the events belonging to `space_id`.
pub fn sse(mut rx: broadcast::Receiver<SpaceEvent>, space_id: String) -> impl IntoResponse {
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if event.space_id != space_id {
                        continue;
                    }
                    let sse_event = Event::default()
                        .event(event.kind.as_str())
                        .data(event.data.to_string());
                    yield Ok::<Event, Infallible>(sse_event);
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, %space_id, "event subscriber lagged, some events dropped");
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
