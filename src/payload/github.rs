//! Pull request comment text

use serde_json::{Value, json};

use super::short_sha;
use crate::build::Build;

/// `This pull request [passes](<build url>) (merged <head7> into <base7>).`
pub fn comment(build: &Build, http_host: &str) -> String {
    let request = &build.request;
    format!(
        "This pull request [{}]({}) (merged {} into {}).",
        if build.passed() { "passes" } else { "fails" },
        build.url(http_host),
        short_sha(request.head_commit.as_deref().unwrap_or_default()),
        short_sha(request.base_commit.as_deref().unwrap_or_default()),
    )
}

/// Issue comment API body.
pub fn comment_body(build: &Build, http_host: &str) -> Value {
    json!({ "body": comment(build, http_host) })
}
