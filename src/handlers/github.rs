//! Pull request comment handler

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::Handler;
use crate::auth::GithubCredentials;
use crate::build::Build;
use crate::config::HandlerKind;
use crate::error::NotifyError;
use crate::event::BuildEvent;
use crate::outcome::Outcome;
use crate::payload::github::comment_body;
use crate::transport::Transport;

const EVENTS: &[BuildEvent] = &[BuildEvent::Finished];

/// Comments the build result on the pull request a build was triggered by
pub struct GithubHandler {
    transport: Arc<dyn Transport>,
    credentials: GithubCredentials,
    http_host: String,
}

impl GithubHandler {
    pub fn new(transport: Arc<dyn Transport>, credentials: GithubCredentials, http_host: String) -> Self {
        Self {
            transport,
            credentials,
            http_host,
        }
    }
}

#[async_trait]
impl Handler for GithubHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Github
    }

    fn interest(&self) -> &'static [BuildEvent] {
        EVENTS
    }

    async fn notify(&self, event: BuildEvent, build: &Build) -> Vec<Outcome> {
        if event != BuildEvent::Finished || !build.request.is_pull_request() {
            debug!("[{}] Build {} is not a finished pull request build", self.name(), build.id);
            return Vec::new();
        }
        let Some(url) = build.request.comments_url.as_deref() else {
            warn!("[{}] Pull request build {} has no comments url", self.name(), build.id);
            return Vec::new();
        };

        let body = comment_body(build, &self.http_host);
        let result = self
            .credentials
            .authenticated(self.transport.as_ref())
            .post(url, &body)
            .await;

        let outcome = Outcome::from_response(self.name(), url.to_string(), result);
        log_comment(&outcome);
        vec![outcome]
    }
}

fn log_comment(outcome: &Outcome) {
    match outcome {
        Outcome::Delivered { handler, url, .. } => {
            info!("[{}] Successfully commented on {}.", handler, url);
        }
        Outcome::Failed {
            handler,
            url,
            error: NotifyError::HttpStatus { status, body, .. },
        } => {
            error!("[{}] Could not comment on {} ({} {:?}).", handler, url, status, body);
        }
        Outcome::Failed { handler, url, error } => {
            error!("[{}] Could not comment on {} ({}).", handler, url, error);
        }
    }
}
