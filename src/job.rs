use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::build::{Commit, Repository};

/// Default queue worker jobs are routed to
pub const DEFAULT_QUEUE: &str = "builds";

/// The kind of work a queued worker job performs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Fetches and resolves the build configuration.
    Configure,
    /// Runs the test suite against an already resolved configuration.
    Test,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Configure => "configure",
            JobKind::Test => "test",
        }
    }
}

/// A job handed to a queued worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub kind: JobKind,
    pub number: String,
    pub commit: Commit,
    pub repository: Repository,
    /// Resolved configuration. Configure jobs have none yet.
    pub config: Option<Value>,
    pub queue: String,
}

impl Job {
    /// Create a configure job for a freshly received commit
    pub fn configure(id: u64, commit: Commit, repository: Repository) -> Self {
        Self {
            id,
            kind: JobKind::Configure,
            number: id.to_string(),
            commit,
            repository,
            config: None,
            queue: DEFAULT_QUEUE.to_string(),
        }
    }

    /// Create a test job with its resolved configuration
    pub fn test(
        id: u64,
        number: String,
        commit: Commit,
        repository: Repository,
        config: Value,
    ) -> Self {
        Self {
            id,
            kind: JobKind::Test,
            number,
            commit,
            repository,
            config: Some(config),
            queue: DEFAULT_QUEUE.to_string(),
        }
    }

    /// Route the job to a different queue
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }
}
