//! Generic webhook handler

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{Handler, unsent};
use crate::auth::webhook_signature;
use crate::build::Build;
use crate::config::HandlerKind;
use crate::error::Result;
use crate::event::BuildEvent;
use crate::outcome::{Outcome, deliver};
use crate::payload::WebhookPayload;
use crate::targets::{TargetKind, resolve};
use crate::transport::{HttpRequest, Transport};

/// Key under `notifications` holding this handler's targets.
pub const CONFIG_KEY: &str = "webhooks";

const EVENTS: &[BuildEvent] = &[BuildEvent::Started, BuildEvent::Finished];

/// Posts the build as a form-encoded JSON payload to every configured URL
pub struct WebhookHandler {
    transport: Arc<dyn Transport>,
    token: Option<String>,
    http_host: String,
}

impl WebhookHandler {
    pub fn new(transport: Arc<dyn Transport>, token: Option<String>, http_host: String) -> Self {
        Self {
            transport,
            token,
            http_host,
        }
    }

    /// Body and `Authorization` value, shared by every target of one dispatch.
    fn prepare(&self, build: &Build) -> Result<(String, String)> {
        let body = WebhookPayload::new(build, &self.http_host).to_form_body()?;
        let signature = webhook_signature(self.token.as_deref(), build)?;
        Ok((body, signature))
    }
}

#[async_trait]
impl Handler for WebhookHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Webhook
    }

    fn interest(&self) -> &'static [BuildEvent] {
        EVENTS
    }

    async fn notify(&self, event: BuildEvent, build: &Build) -> Vec<Outcome> {
        let targets = resolve(TargetKind::Url, build.notification_config(CONFIG_KEY), event, build);
        if targets.is_empty() {
            debug!("[{}] No targets for {} of build {}", self.name(), event, build.id);
            return Vec::new();
        }

        let (body, signature) = match self.prepare(build) {
            Ok(prepared) => prepared,
            Err(e) => return unsent(self.name(), &targets, &e),
        };

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let request = HttpRequest::post(target.url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Authorization", signature.as_str())
                .body(body.as_str());
            outcomes.push(deliver(self.name(), self.transport.as_ref(), request).await);
        }
        outcomes
    }
}
