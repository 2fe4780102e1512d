//! Chat room message lines

use serde_json::{Value, json};

use super::short_sha;
use crate::build::Build;

/// Status summary for a build, one chat message per line.
pub fn build_message(build: &Build, service_name: &str, http_host: &str) -> Vec<String> {
    let commit = &build.commit;
    let outcome = if build.passed() { "passed" } else { "failed" };
    vec![
        format!(
            "[{}] {}#{} ({} - {} : {}): the build has {}",
            service_name,
            build.repository.slug(),
            build.number,
            commit.branch,
            short_sha(&commit.sha),
            commit.author_name.as_deref().unwrap_or("unknown"),
            outcome
        ),
        format!(
            "[{}] Change view : {}",
            service_name,
            commit.compare_url.as_deref().unwrap_or("")
        ),
        format!(
            "[{}] Build details : {}",
            service_name,
            build.url(http_host)
        ),
    ]
}

/// JSON body for one line: `{"message": {"body": "<line>"}}`.
pub fn speak_body(line: &str) -> Value {
    json!({ "message": { "body": line } })
}
