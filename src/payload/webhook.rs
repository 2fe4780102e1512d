//! Payload posted to generic webhooks

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::build::Build;
use crate::error::Result;

/// Keys every webhook payload carries, in wire order.
pub const WEBHOOK_PAYLOAD_KEYS: &[&str] = &[
    "id",
    "number",
    "status",
    "result",
    "status_message",
    "result_message",
    "started_at",
    "finished_at",
    "duration",
    "build_url",
    "commit",
    "branch",
    "message",
    "compare_url",
    "committed_at",
    "author_name",
    "author_email",
    "committer_name",
    "committer_email",
    "repository",
    "config",
];

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryPayload<'a> {
    pub id: u64,
    pub name: &'a str,
    pub owner_name: &'a str,
    pub url: Option<&'a str>,
}

/// Flattened build, commit, repository and config.
///
/// Unknown values serialize as `null`; no key is ever skipped.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub id: u64,
    pub number: &'a str,
    pub status: Option<u8>,
    pub result: Option<u8>,
    pub status_message: &'static str,
    pub result_message: &'static str,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub build_url: String,
    pub commit: &'a str,
    pub branch: &'a str,
    pub message: Option<&'a str>,
    pub compare_url: Option<&'a str>,
    pub committed_at: Option<DateTime<Utc>>,
    pub author_name: Option<&'a str>,
    pub author_email: Option<&'a str>,
    pub committer_name: Option<&'a str>,
    pub committer_email: Option<&'a str>,
    pub repository: RepositoryPayload<'a>,
    pub config: &'a Value,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(build: &'a Build, http_host: &str) -> Self {
        let code = build.result.map(|r| r.code());
        let message = build.result.map(|r| r.message()).unwrap_or("Pending");
        let commit = &build.commit;
        Self {
            id: build.id,
            number: &build.number,
            status: code,
            result: code,
            status_message: message,
            result_message: message,
            started_at: build.started_at,
            finished_at: build.finished_at,
            duration: build.duration(),
            build_url: build.url(http_host),
            commit: &commit.sha,
            branch: &commit.branch,
            message: commit.message.as_deref(),
            compare_url: commit.compare_url.as_deref(),
            committed_at: commit.committed_at,
            author_name: commit.author_name.as_deref(),
            author_email: commit.author_email.as_deref(),
            committer_name: commit.committer_name.as_deref(),
            committer_email: commit.committer_email.as_deref(),
            repository: RepositoryPayload {
                id: build.repository.id,
                name: &build.repository.name,
                owner_name: &build.repository.owner_name,
                url: build.repository.url.as_deref(),
            },
            config: &build.config,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// `application/x-www-form-urlencoded` body: `payload=<json>`.
    pub fn to_form_body(&self) -> Result<String> {
        let json = self.to_json()?;
        Ok(url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &json)
            .finish())
    }
}
