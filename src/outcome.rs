//! Per-target delivery results

use serde::Serialize;
use tracing::{error, info};

use crate::error::{NotifyError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Result of contacting one target.
///
/// Failures are data: a handler returns one `Outcome` per target and the
/// dispatcher keeps going regardless of what is inside.
#[derive(Debug)]
pub enum Outcome {
    Delivered {
        handler: &'static str,
        url: String,
        status: u16,
    },
    Failed {
        handler: &'static str,
        url: String,
        error: NotifyError,
    },
}

/// Serializable snapshot of an [`Outcome`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutcomeRecord {
    pub handler: String,
    pub url: String,
    pub status: &'static str,
    pub code: Option<u16>,
    pub error: Option<String>,
}

impl Outcome {
    /// Classify a transport result: any 2xx is delivered, everything else failed.
    pub fn from_response(handler: &'static str, url: String, result: Result<HttpResponse>) -> Self {
        match result {
            Ok(response) if response.is_success() => Outcome::Delivered {
                handler,
                url,
                status: response.status,
            },
            Ok(response) => Outcome::Failed {
                handler,
                error: NotifyError::HttpStatus {
                    url: url.clone(),
                    status: response.status,
                    body: response.body,
                },
                url,
            },
            Err(error) => Outcome::Failed {
                handler,
                url,
                error,
            },
        }
    }

    pub fn handler(&self) -> &'static str {
        match self {
            Outcome::Delivered { handler, .. } | Outcome::Failed { handler, .. } => *handler,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Outcome::Delivered { url, .. } | Outcome::Failed { url, .. } => url,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }

    pub fn log(&self) {
        match self {
            Outcome::Delivered { handler, url, .. } => {
                info!("[{}] Successfully notified {}", handler, url);
            }
            Outcome::Failed {
                handler,
                url,
                error,
            } => {
                error!("[{}] Could not notify {}. {}", handler, url, error);
            }
        }
    }

    pub fn to_record(&self) -> OutcomeRecord {
        match self {
            Outcome::Delivered {
                handler,
                url,
                status,
            } => OutcomeRecord {
                handler: handler.to_string(),
                url: url.clone(),
                status: "delivered",
                code: Some(*status),
                error: None,
            },
            Outcome::Failed {
                handler,
                url,
                error,
            } => OutcomeRecord {
                handler: handler.to_string(),
                url: url.clone(),
                status: "failed",
                code: error.status(),
                error: Some(error.to_string()),
            },
        }
    }
}

/// Send one request and reduce whatever happens to a logged [`Outcome`].
pub async fn deliver(
    handler: &'static str,
    transport: &dyn Transport,
    request: HttpRequest,
) -> Outcome {
    let url = request.url.clone();
    let outcome = Outcome::from_response(handler, url, transport.send(request).await);
    outcome.log();
    outcome
}
