//! Normalizes per-handler notification config into concrete targets.
//!
//! The raw value at `config.notifications.<handler>` may be a string, a list
//! of strings or a map with an `urls` entry plus behavioral flags:
//!
//! ```yaml
//! notifications:
//!   webhooks: http://example.com/hook
//!   campfire: [account:token@42, other:token@69]
//!   webhooks:
//!     urls: [http://a.example.com/, http://b.example.com/]
//!     on_start: always
//!     on_failure: change
//! ```
//!
//! Nothing outside this module branches on those shapes.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::build::{Build, BuildResult};
use crate::error::{NotifyError, Result};
use crate::event::BuildEvent;

const CAMPFIRE_HOST_SUFFIX: &str = ".campfirenow.com";

/// How a handler interprets each configured string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// The string is the destination URL.
    Url,
    /// The string names a chat room and embeds its API token.
    ChatRoom,
}

/// Credentials parsed out of a chat room target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCredentials {
    pub account: String,
    pub token: String,
    pub room: String,
}

/// One concrete destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub credentials: Option<RoomCredentials>,
}

impl Target {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
        }
    }

    /// Parse `account:token@room` or `https://token@account.campfirenow.com/room/<room>`.
    pub fn chat_room(raw: &str) -> Result<Self> {
        let credentials = if raw.contains("://") {
            parse_room_url(raw)?
        } else {
            parse_room_shorthand(raw)?
        };
        Ok(Self {
            url: format!(
                "https://{}{}/room/{}/speak.json",
                credentials.account, CAMPFIRE_HOST_SUFFIX, credentials.room
            ),
            credentials: Some(credentials),
        })
    }
}

fn invalid(raw: &str, reason: &str) -> NotifyError {
    NotifyError::InvalidTarget {
        target: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_room_shorthand(raw: &str) -> Result<RoomCredentials> {
    let (left, room) = raw
        .rsplit_once('@')
        .ok_or_else(|| invalid(raw, "expected account:token@room"))?;
    let (account, token) = left
        .split_once(':')
        .ok_or_else(|| invalid(raw, "expected account:token@room"))?;
    if !is_word(account) || !is_word(token) || !is_word(room) {
        return Err(invalid(raw, "account, token and room must be non-empty words"));
    }
    Ok(RoomCredentials {
        account: account.to_string(),
        token: token.to_string(),
        room: room.to_string(),
    })
}

fn parse_room_url(raw: &str) -> Result<RoomCredentials> {
    let url = Url::parse(raw).map_err(|e| invalid(raw, &e.to_string()))?;
    let token = url.username();
    if token.is_empty() {
        return Err(invalid(raw, "missing token in user info"));
    }
    let account = url
        .host_str()
        .and_then(|host| host.strip_suffix(CAMPFIRE_HOST_SUFFIX))
        .ok_or_else(|| invalid(raw, "host is not a campfire account"))?;
    let mut segments = url
        .path_segments()
        .ok_or_else(|| invalid(raw, "missing room path"))?;
    let room = match (segments.next(), segments.next()) {
        (Some("room"), Some(room)) if is_word(room) => room,
        _ => return Err(invalid(raw, "expected /room/<id> path")),
    };
    if !is_word(account) {
        return Err(invalid(raw, "invalid account"));
    }
    Ok(RoomCredentials {
        account: account.to_string(),
        token: token.to_string(),
        room: room.to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Text(String),
    /// Numbers, lists and maps. Never makes the surrounding config unreadable.
    Other(Value),
}

/// Whether `build:started` notifies at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFlag")]
pub enum OnStart {
    #[default]
    Never,
    Always,
}

impl From<RawFlag> for OnStart {
    fn from(raw: RawFlag) -> Self {
        match raw {
            RawFlag::Bool(true) => OnStart::Always,
            RawFlag::Text(s) if s == "always" || s == "true" => OnStart::Always,
            // any other non-null value is truthy
            RawFlag::Other(value) if !value.is_null() => OnStart::Always,
            _ => OnStart::Never,
        }
    }
}

/// Filter applied to `build:finished` per build result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFlag")]
pub enum FinishFilter {
    #[default]
    Always,
    Never,
    /// Only when the result differs from the previous build's.
    Change,
}

impl From<RawFlag> for FinishFilter {
    fn from(raw: RawFlag) -> Self {
        match raw {
            RawFlag::Bool(false) => FinishFilter::Never,
            RawFlag::Text(s) if s == "never" || s == "false" => FinishFilter::Never,
            RawFlag::Text(s) if s == "change" => FinishFilter::Change,
            _ => FinishFilter::Always,
        }
    }
}

impl FinishFilter {
    fn allows(&self, result: Option<BuildResult>, previous: Option<BuildResult>) -> bool {
        match self {
            FinishFilter::Always => true,
            FinishFilter::Never => false,
            FinishFilter::Change => previous.is_none() || previous != result,
        }
    }
}

/// One URL or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Urls {
    One(String),
    Many(Vec<String>),
}

impl Urls {
    fn into_vec(self) -> Vec<String> {
        let urls = match self {
            Urls::One(url) => vec![url],
            Urls::Many(urls) => urls,
        };
        // blank entries contribute nothing; everything else keeps its position
        urls.into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect()
    }
}

/// Map form: `urls` plus behavioral flags
#[derive(Debug, Clone, Deserialize)]
pub struct KeyedConfig {
    #[serde(default)]
    urls: Option<Urls>,
    #[serde(default)]
    on_start: Option<OnStart>,
    #[serde(default)]
    on_success: Option<FinishFilter>,
    #[serde(default)]
    on_failure: Option<FinishFilter>,
}

/// A handler's raw notification config in one of its accepted shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HandlerConfig {
    Plain(Urls),
    Keyed(KeyedConfig),
}

impl HandlerConfig {
    /// Parse a raw config value. Absent, null or unreadable values yield `None`.
    pub fn from_value(raw: Option<&Value>) -> Option<Self> {
        let raw = raw?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring unreadable notification config {}: {}", raw, e);
                None
            }
        }
    }

    fn wants(&self, event: BuildEvent, build: &Build) -> bool {
        match (self, event) {
            (HandlerConfig::Plain(_), BuildEvent::Started) => false,
            (HandlerConfig::Plain(_), BuildEvent::Finished) => true,
            (HandlerConfig::Keyed(keyed), BuildEvent::Started) => {
                keyed.on_start.unwrap_or_default() == OnStart::Always
            }
            (HandlerConfig::Keyed(keyed), BuildEvent::Finished) => {
                let filter = match build.result {
                    Some(BuildResult::Failed) => keyed.on_failure,
                    _ => keyed.on_success,
                };
                filter
                    .unwrap_or_default()
                    .allows(build.result, build.previous_result)
            }
        }
    }

    fn into_urls(self) -> Vec<String> {
        match self {
            HandlerConfig::Plain(urls) => urls.into_vec(),
            HandlerConfig::Keyed(keyed) => keyed.urls.map(Urls::into_vec).unwrap_or_default(),
        }
    }
}

/// Resolve the ordered destination list for one handler and one event.
///
/// Never fails: blank config means no targets, and chat room strings that
/// cannot be parsed are logged and skipped while their siblings still resolve.
pub fn resolve(kind: TargetKind, raw: Option<&Value>, event: BuildEvent, build: &Build) -> Vec<Target> {
    let Some(config) = HandlerConfig::from_value(raw) else {
        return Vec::new();
    };
    if !config.wants(event, build) {
        debug!("Notification config opts out of {} for build {}", event, build.id);
        return Vec::new();
    }

    config
        .into_urls()
        .into_iter()
        .filter_map(|raw| match kind {
            TargetKind::Url => Some(Target::url(raw)),
            TargetKind::ChatRoom => match Target::chat_room(&raw) {
                Ok(target) => Some(target),
                Err(e) => {
                    warn!("Skipping chat room target: {}", e);
                    None
                }
            },
        })
        .collect()
}
