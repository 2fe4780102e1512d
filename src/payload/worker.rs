//! Payloads handed to queued workers.
//!
//! Configure jobs run before a build configuration exists, so their payload
//! has no `config` key. Test jobs always carry one.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{NotifyError, Result};
use crate::job::{Job, JobKind};

static NO_CONFIG: Value = Value::Null;

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRef {
    pub id: u64,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigureBuild<'a> {
    pub id: u64,
    pub commit: &'a str,
    pub branch: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestBuild<'a> {
    pub id: u64,
    pub number: &'a str,
    pub commit: &'a str,
    pub branch: &'a str,
}

/// Wire payload for one worker job, keys in wire order
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WorkerPayload<'a> {
    Configure {
        #[serde(rename = "type")]
        kind: &'static str,
        build: ConfigureBuild<'a>,
        repository: RepositoryRef,
        queue: &'a str,
    },
    Test {
        #[serde(rename = "type")]
        kind: &'static str,
        build: TestBuild<'a>,
        repository: RepositoryRef,
        config: &'a Value,
        queue: &'a str,
    },
}

impl<'a> WorkerPayload<'a> {
    pub fn new(job: &'a Job) -> Self {
        let repository = RepositoryRef {
            id: job.repository.id,
            slug: job.repository.slug(),
        };
        match job.kind {
            JobKind::Configure => WorkerPayload::Configure {
                kind: JobKind::Configure.as_str(),
                build: ConfigureBuild {
                    id: job.id,
                    commit: &job.commit.sha,
                    branch: &job.commit.branch,
                },
                repository,
                queue: &job.queue,
            },
            JobKind::Test => WorkerPayload::Test {
                kind: JobKind::Test.as_str(),
                build: TestBuild {
                    id: job.id,
                    number: &job.number,
                    commit: &job.commit.sha,
                    branch: &job.commit.branch,
                },
                repository,
                config: job.config.as_ref().unwrap_or(&NO_CONFIG),
                queue: &job.queue,
            },
        }
    }

    /// Ordered field map for the job.
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        into_object(serde_json::to_value(self)?)
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(NotifyError::Payload(format!(
            "worker payload is not an object: {}",
            other
        ))),
    }
}

/// Ordered field map for a worker job.
pub fn for_job(job: &Job) -> Result<Map<String, Value>> {
    WorkerPayload::new(job).to_map()
}
