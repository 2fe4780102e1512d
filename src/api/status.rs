//! Liveness, status and handler listing

use axum::{
    Json,
    extract::{Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::Level;

use crate::SharedState;

const DEFAULT_LOG_LIMIT: usize = 50;

/// A registered handler and the events it listens to
#[derive(Debug, Serialize)]
pub struct HandlerInfo {
    pub name: &'static str,
    pub events: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub logs: Option<usize>,
    pub level: Option<String>,
}

/// GET /
pub async fn root() -> &'static str {
    "build_notify is running"
}

/// GET /api/handlers
pub async fn list_handlers(AxumState(state): AxumState<SharedState>) -> Json<Vec<HandlerInfo>> {
    let handlers = state
        .dispatcher
        .registry()
        .describe()
        .into_iter()
        .map(|(name, events)| HandlerInfo { name, events })
        .collect();
    Json(handlers)
}

/// GET /api/status - server info plus the most recent log entries.
/// Supports `?logs=<n>` to change how many entries are returned and
/// `?level=warn` to only return entries at that level.
pub async fn status(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<StatusParams>,
) -> Response {
    let registry = state.dispatcher.registry();
    let limit = params.logs.unwrap_or(DEFAULT_LOG_LIMIT);
    let recent_logs = match params.level.as_deref() {
        None => state.log_layer.recent(limit),
        Some(level) => match level.parse::<Level>() {
            Ok(level) => state.log_layer.recent_at_level(level, limit),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Unknown log level: {}", level) })),
                )
                    .into_response();
            }
        },
    };

    Json(json!({
        "server": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at.to_rfc3339(),
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "http_host": state.config.http_host,
        },
        "handlers": {
            "count": registry.len(),
            "names": registry.handlers().map(|h| h.name()).collect::<Vec<_>>(),
        },
        "live_subscribers": state.delivery_events.receiver_count(),
        "recent_logs": recent_logs,
    }))
    .into_response()
}
