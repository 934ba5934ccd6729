//! Server-sent event stream of hub events

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::{Stream, StreamExt};

use super::ApiState;
use crate::events::HubEvent;

/// Interval between keep-alive comments
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Build events router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/events", get(events))
        .with_state(state)
}

fn to_sse(event: &HubEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, event = event.name(), "failed to encode event");
            Event::default().comment("encode error")
        })
}

/// Stream hub events to an observer
///
/// The subscription lives inside the stream, so a disconnected client is
/// unregistered as soon as axum drops the response body.
async fn events(
    State(state): State<Arc<ApiState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe();
    tracing::debug!(observer = %subscription.id(), "observer connected");

    let stream = subscription.map(|event| Ok(to_sse(&event)));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
