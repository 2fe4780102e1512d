//! Table of active handlers, built once at startup.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::GithubCredentials;
use crate::config::{HandlerKind, NotifyConfig};
use crate::error::{NotifyError, Result};
use crate::event::{self, BuildEvent};
use crate::handlers::{CampfireHandler, GithubHandler, Handler, WebhookHandler};
use crate::transport::Transport;

/// Immutable, ordered set of handler instances. Iteration follows
/// registration order, so dispatch order is stable across calls.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Instantiate every handler kind listed under `notifications`, once each.
    pub fn from_config(config: &NotifyConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut handlers: Vec<Box<dyn Handler>> = Vec::new();

        for kind in &config.notifications {
            if !seen.insert(*kind) {
                warn!("Handler '{}' is listed more than once, ignoring duplicate", kind);
                continue;
            }
            let handler: Box<dyn Handler> = match kind {
                HandlerKind::Webhook => Box::new(WebhookHandler::new(
                    transport.clone(),
                    config.webhook.token.clone(),
                    config.http_host.clone(),
                )),
                HandlerKind::Campfire => Box::new(CampfireHandler::new(
                    transport.clone(),
                    config.campfire.service_name.clone(),
                    config.http_host.clone(),
                )),
                HandlerKind::Github => {
                    let token = config.github.token.clone().ok_or_else(|| {
                        NotifyError::ConfigError("github.token is required".to_string())
                    })?;
                    Box::new(GithubHandler::new(
                        transport.clone(),
                        GithubCredentials::new(token),
                        config.http_host.clone(),
                    ))
                }
            };
            info!("Registered '{}' handler", kind);
            handlers.push(handler);
        }

        Ok(Self { handlers })
    }

    /// Registry over already constructed handlers, kept in the given order.
    pub fn with_handlers(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> impl Iterator<Item = &dyn Handler> {
        self.handlers.iter().map(|h| h.as_ref())
    }

    /// Handlers whose declared interest includes `event_name`.
    pub fn interested_in<'a>(&'a self, event_name: &'a str) -> impl Iterator<Item = &'a dyn Handler> {
        self.handlers()
            .filter(move |handler| event::matches(handler.interest(), event_name))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Interest of every registered handler, in registration order.
    pub fn describe(&self) -> Vec<(&'static str, Vec<&'static str>)> {
        self.handlers()
            .map(|h| (h.name(), h.interest().iter().map(BuildEvent::name).collect()))
            .collect()
    }
}
