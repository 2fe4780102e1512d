//! Read-only view of a build as handed over by the build lifecycle owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final result of a finished build
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuildResult {
    Passed,
    Failed,
}

impl BuildResult {
    /// Numeric status as carried in webhook payloads (0 = passed).
    pub fn code(&self) -> u8 {
        match self {
            BuildResult::Passed => 0,
            BuildResult::Failed => 1,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BuildResult::Passed => "Passed",
            BuildResult::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Repository {
    pub id: u64,
    pub owner_name: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Repository {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub compare_url: Option<String>,
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub committer_name: Option<String>,
    #[serde(default)]
    pub committer_email: Option<String>,
}

/// The request (push or pull request) a build originated from
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Request {
    #[serde(default)]
    pub pull_request: bool,
    /// Only present for pull requests.
    #[serde(default)]
    pub comments_url: Option<String>,
    #[serde(default)]
    pub head_commit: Option<String>,
    #[serde(default)]
    pub base_commit: Option<String>,
}

impl Request {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: u64,
    pub number: String,
    #[serde(default)]
    pub result: Option<BuildResult>,
    /// Result of the previous build on the same branch, if any.
    #[serde(default)]
    pub previous_result: Option<BuildResult>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// The build configuration document, including its `notifications` section.
    #[serde(default)]
    pub config: Value,
    pub repository: Repository,
    pub commit: Commit,
    #[serde(default)]
    pub request: Request,
}

impl Build {
    pub fn passed(&self) -> bool {
        self.result == Some(BuildResult::Passed)
    }

    /// Duration in seconds, when both timestamps are known.
    pub fn duration(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }

    /// Raw value at `config.notifications.<name>`, if any.
    pub fn notification_config(&self, name: &str) -> Option<&Value> {
        self.config.get("notifications").and_then(|n| n.get(name))
    }

    /// Public URL of this build's page.
    pub fn url(&self, http_host: &str) -> String {
        format!(
            "{}/{}/builds/{}",
            http_host.trim_end_matches('/'),
            self.repository.slug(),
            self.id
        )
    }
}
