//! Build event intake

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::SharedState;
use crate::build::Build;
use crate::dispatcher::DispatchReport;
use crate::outcome::OutcomeRecord;

/// Body of `POST /api/events`
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub event: String,
    pub build: Build,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event: &'static str,
    pub build_id: u64,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub outcomes: Vec<OutcomeRecord>,
}

impl From<&DispatchReport> for EventResponse {
    fn from(report: &DispatchReport) -> Self {
        Self {
            event: report.event.name(),
            build_id: report.build_id,
            attempted: report.attempted(),
            delivered: report.delivered(),
            failed: report.failed(),
            outcomes: report.outcomes.iter().map(|o| o.to_record()).collect(),
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// POST /api/events - dispatch one build event and report every outcome.
///
/// Delivery failures are part of the report and never change the status code.
pub async fn post_event(AxumState(state): AxumState<SharedState>, body: Bytes) -> Response {
    let request: EventRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            info!("Could not parse event body: {}", e);
            return bad_request(format!("Invalid event body: {}", e));
        }
    };

    match state.dispatcher.dispatch_named(&request.event, &request.build).await {
        Ok(report) => {
            info!(
                "Build {} {}: {} attempted, {} delivered, {} failed",
                report.build_id,
                report.event,
                report.attempted(),
                report.delivered(),
                report.failed()
            );
            Json(EventResponse::from(&report)).into_response()
        }
        Err(e) => {
            warn!("Rejected event for build {}: {}", request.build.id, e);
            bad_request(e.to_string())
        }
    }
}
