//! HTTP surface hosting the dispatcher

pub mod events;
pub mod status;
pub mod stream;

use axum::{Router, routing};

use crate::SharedState;

pub use events::{EventRequest, EventResponse, post_event};
pub use status::{list_handlers, root, status};
pub use stream::stream_outcomes;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/api/events", routing::post(post_event))
        .route("/api/handlers", routing::get(list_handlers))
        .route("/api/status", routing::get(status))
        .route("/api/stream/outcomes", routing::get(stream_outcomes))
        .with_state(state)
}
