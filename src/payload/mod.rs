//! Wire representations of a build, one module per handler kind.
//!
//! Everything here is a pure function of its input: no I/O, no clock.

pub mod campfire;
pub mod github;
pub mod webhook;
pub mod worker;

pub use webhook::{WEBHOOK_PAYLOAD_KEYS, WebhookPayload};
pub use worker::WorkerPayload;

/// First seven characters of a commit hash, or the whole hash if shorter.
pub fn short_sha(sha: &str) -> &str {
    sha.char_indices().nth(7).map_or(sha, |(idx, _)| &sha[..idx])
}
