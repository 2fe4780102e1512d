use std::io;

/// Custom error type for build_notify operations
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Transport error: {message}")]
    Transport { url: String, message: String },

    #[error("Status: {status} ({body:?})")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Could not prepare request: {0}")]
    Payload(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl NotifyError {
    /// True when the target could not be reached at all (no status code).
    pub fn is_transport(&self) -> bool {
        matches!(self, NotifyError::Transport { .. })
    }

    /// Response status for non-2xx failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            NotifyError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Helper type for Results that use NotifyError
pub type Result<T> = std::result::Result<T, NotifyError>;
