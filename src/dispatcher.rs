//! Routes build events to every interested handler.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::build::Build;
use crate::error::Result;
use crate::event::BuildEvent;
use crate::outcome::{Outcome, OutcomeRecord};
use crate::registry::HandlerRegistry;

/// Delivery outcome published to live subscribers
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryEvent {
    pub event: &'static str,
    pub build_id: u64,
    #[serde(flatten)]
    pub outcome: OutcomeRecord,
    pub timestamp: String,
}

/// Everything that happened for one dispatch call
#[derive(Debug)]
pub struct DispatchReport {
    pub event: BuildEvent,
    pub build_id: u64,
    pub outcomes: Vec<Outcome>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.delivered()
    }
}

/// Stateless fan-out over a read-only registry.
///
/// Handlers run one after another in registration order and each handler
/// contacts its targets in resolution order. Nothing is cached between calls.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    events: Option<broadcast::Sender<DeliveryEvent>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            events: None,
        }
    }

    /// Also publish every outcome on `events`.
    pub fn with_events(mut self, events: broadcast::Sender<DeliveryEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, event: BuildEvent, build: &Build) -> DispatchReport {
        info!(
            "Dispatching {} for build {} of {}",
            event,
            build.id,
            build.repository.slug()
        );

        let mut outcomes = Vec::new();
        for handler in self.registry.interested_in(event.name()) {
            let handler_outcomes = handler.notify(event, build).await;
            debug!(
                "[{}] {} request(s) for build {}",
                handler.name(),
                handler_outcomes.len(),
                build.id
            );
            self.publish(event, build, &handler_outcomes);
            outcomes.extend(handler_outcomes);
        }

        DispatchReport {
            event,
            build_id: build.id,
            outcomes,
        }
    }

    /// Dispatch by event name. Unknown names are rejected before any handler runs.
    pub async fn dispatch_named(&self, event_name: &str, build: &Build) -> Result<DispatchReport> {
        let event: BuildEvent = event_name.parse()?;
        Ok(self.dispatch(event, build).await)
    }

    fn publish(&self, event: BuildEvent, build: &Build, outcomes: &[Outcome]) {
        let Some(events) = &self.events else {
            return;
        };
        for outcome in outcomes {
            // no subscribers is fine
            let _ = events.send(DeliveryEvent {
                event: event.name(),
                build_id: build.id,
                outcome: outcome.to_record(),
                timestamp: Utc::now().to_rfc3339(),
            });
        }
    }
}
