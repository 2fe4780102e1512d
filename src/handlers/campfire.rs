//! Campfire chat room handler

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::Handler;
use crate::auth::chat_room_authorization;
use crate::build::Build;
use crate::config::HandlerKind;
use crate::event::BuildEvent;
use crate::outcome::{Outcome, deliver};
use crate::payload::campfire::{build_message, speak_body};
use crate::targets::{TargetKind, resolve};
use crate::transport::{HttpRequest, Transport};

pub const CONFIG_KEY: &str = "campfire";

const EVENTS: &[BuildEvent] = &[BuildEvent::Finished];

/// Speaks the build summary into every configured room, one request per line
pub struct CampfireHandler {
    transport: Arc<dyn Transport>,
    service_name: String,
    http_host: String,
}

impl CampfireHandler {
    pub fn new(transport: Arc<dyn Transport>, service_name: String, http_host: String) -> Self {
        Self {
            transport,
            service_name,
            http_host,
        }
    }
}

#[async_trait]
impl Handler for CampfireHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Campfire
    }

    fn interest(&self) -> &'static [BuildEvent] {
        EVENTS
    }

    async fn notify(&self, event: BuildEvent, build: &Build) -> Vec<Outcome> {
        let targets = resolve(TargetKind::ChatRoom, build.notification_config(CONFIG_KEY), event, build);
        if targets.is_empty() {
            debug!("[{}] No rooms for {} of build {}", self.name(), event, build.id);
            return Vec::new();
        }

        let lines = build_message(build, &self.service_name, &self.http_host);
        let mut outcomes = Vec::with_capacity(targets.len() * lines.len());
        for target in targets {
            // resolve() only yields chat room targets with credentials
            let Some(credentials) = target.credentials.as_ref() else {
                continue;
            };
            let authorization = chat_room_authorization(&credentials.token);
            for line in &lines {
                let request = HttpRequest::post(target.url.as_str())
                    .header("Authorization", authorization.as_str())
                    .header("Content-Type", "application/json")
                    .body(speak_body(line).to_string());
                outcomes.push(deliver(self.name(), self.transport.as_ref(), request).await);
            }
        }
        outcomes
    }
}
