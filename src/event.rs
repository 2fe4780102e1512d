//! Build lifecycle events and interest matching

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NotifyError;

/// Lifecycle events a build emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildEvent {
    #[serde(rename = "build:started")]
    Started,
    #[serde(rename = "build:finished")]
    Finished,
}

impl BuildEvent {
    pub const ALL: &'static [BuildEvent] = &[BuildEvent::Started, BuildEvent::Finished];

    pub fn name(&self) -> &'static str {
        match self {
            BuildEvent::Started => "build:started",
            BuildEvent::Finished => "build:finished",
        }
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuildEvent {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildEvent::ALL
            .iter()
            .copied()
            .find(|event| event.name() == s)
            .ok_or_else(|| NotifyError::UnknownEvent(s.to_string()))
    }
}

/// Returns true if `event_name` is literally one of the events in `interest`.
///
/// There are no wildcards: a handler declaring `[build:finished]` is never
/// handed `build:started`.
pub fn matches(interest: &[BuildEvent], event_name: &str) -> bool {
    interest.iter().any(|event| event.name() == event_name)
}
