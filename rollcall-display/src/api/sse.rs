//! Server-Sent Events stream of display state
//!
//! Each connected kiosk page receives the current snapshot immediately and
//! then every change as a `display` event.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::AppState;

/// SSE event name for snapshots
pub const DISPLAY_EVENT: &str = "display";

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let stream = WatchStream::new(state.display.subscribe()).filter_map(|snapshot| async move {
        match serde_json::to_string(&snapshot) {
            Ok(json) => Some(Ok(Event::default().event(DISPLAY_EVENT).data(json))),
            Err(e) => {
                warn!("Failed to serialize display snapshot: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
