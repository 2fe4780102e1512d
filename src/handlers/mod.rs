//! Notification handlers.
//!
//! Each handler declares the events it cares about and, when notified,
//! resolves its own targets, builds its own payloads and attaches its own
//! credentials. Handlers share no base behavior beyond [`deliver`].
//!
//! [`deliver`]: crate::outcome::deliver

mod campfire;
mod github;
mod webhook;

pub use campfire::CampfireHandler;
pub use github::GithubHandler;
pub use webhook::WebhookHandler;

use async_trait::async_trait;

use crate::build::Build;
use crate::config::HandlerKind;
use crate::error::NotifyError;
use crate::event::BuildEvent;
use crate::outcome::Outcome;
use crate::targets::Target;

#[async_trait]
pub trait Handler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Events this handler wants to see. Never consulted after I/O starts.
    fn interest(&self) -> &'static [BuildEvent];

    /// Notify every target for this event. One outcome per request sent;
    /// an empty vec means nothing needed to be sent.
    async fn notify(&self, event: BuildEvent, build: &Build) -> Vec<Outcome>;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Outcomes for targets that never got a request because preparing it failed.
fn unsent(handler: &'static str, targets: &[Target], reason: &NotifyError) -> Vec<Outcome> {
    targets
        .iter()
        .map(|target| {
            let outcome = Outcome::Failed {
                handler,
                url: target.url.clone(),
                error: NotifyError::Payload(reason.to_string()),
            };
            outcome.log();
            outcome
        })
        .collect()
}
