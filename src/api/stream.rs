//! SSE streaming of delivery outcomes

use axum::{
    extract::State as AxumState,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::SharedState;

/// GET /api/stream/outcomes - one event per delivery attempt, named
/// `delivered` or `failed`
pub async fn stream_outcomes(
    AxumState(state): AxumState<SharedState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.delivery_events.subscribe();
    let stream = BroadcastStream::new(rx);

    let event_stream = stream.filter_map(|result| {
        match result {
            Ok(delivery) => {
                let data = serde_json::to_string(&delivery).unwrap_or_default();
                Some(Ok(Event::default().event(delivery.outcome.status).data(data)))
            }
            Err(_) => None, // Skip lagged messages
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
