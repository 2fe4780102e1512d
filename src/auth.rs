//! Credentials attached to outbound notification requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::build::Build;
use crate::error::{NotifyError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

type HmacSha256 = Hmac<Sha256>;

/// Signature for generic webhooks: hex HMAC-SHA256 of the repository slug,
/// keyed with the process-wide webhook token.
///
/// Receivers holding the same token can recompute it to check the sender.
pub fn webhook_signature(token: Option<&str>, build: &Build) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(token.unwrap_or_default().as_bytes())
        .map_err(|e| NotifyError::Payload(e.to_string()))?;
    mac.update(build.repository.slug().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a webhook signature produced by [`webhook_signature`].
pub fn verify_webhook_signature(token: Option<&str>, build: &Build, signature: &str) -> bool {
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(token.unwrap_or_default().as_bytes()) else {
        return false;
    };
    mac.update(build.repository.slug().as_bytes());
    // constant time
    mac.verify_slice(&signature_bytes).is_ok()
}

/// `Authorization` value for chat rooms, derived from the per-room token.
pub fn chat_room_authorization(token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:X", token)))
}

/// The process-wide GitHub API token.
///
/// The token is never handed out; requests can only be made through the
/// scoped [`AuthenticatedApi`] returned by [`GithubCredentials::authenticated`].
#[derive(Clone)]
pub struct GithubCredentials {
    token: String,
}

impl GithubCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn authenticated<'a>(&'a self, transport: &'a dyn Transport) -> AuthenticatedApi<'a> {
        AuthenticatedApi {
            transport,
            token: &self.token,
        }
    }
}

impl std::fmt::Debug for GithubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubCredentials")
            .field("token", &"[redacted]")
            .finish()
    }
}

/// GitHub API access for the lifetime of one borrow of the credentials
pub struct AuthenticatedApi<'a> {
    transport: &'a dyn Transport,
    token: &'a str,
}

impl AuthenticatedApi<'_> {
    /// POST a JSON document to an API URL.
    pub async fn post(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        let request = HttpRequest::post(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(body)?);
        self.transport.send(request).await
    }
}
