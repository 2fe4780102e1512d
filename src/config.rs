use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::NotifyError;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_CONFIG_PATH: &str = "notify_config.toml";

/// Kinds of notification handlers that can be enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Webhook,
    Campfire,
    Github,
}

impl HandlerKind {
    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::Webhook => "webhook",
            HandlerKind::Campfire => "campfire",
            HandlerKind::Github => "github",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    /// Enabled handlers, in dispatch order.
    #[serde(default)]
    pub notifications: Vec<HandlerKind>,
    /// Public base URL of the CI web frontend, used for build links.
    pub http_host: String,
    pub bind_address: Option<String>,
    #[serde(default)]
    pub webhook: TokenConfig,
    #[serde(default)]
    pub github: TokenConfig,
    #[serde(default)]
    pub campfire: CampfireConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TokenConfig {
    pub token: Option<String>,
}

impl TokenConfig {
    /// Returns true if a non-empty token is set.
    pub fn has_token(&self) -> bool {
        self.token
            .as_ref()
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CampfireConfig {
    /// Prefix shown in front of every chat line.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "ci".to_string()
}

impl Default for CampfireConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("build_notify/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write daily rotated log files here in addition to the console.
    pub log_dir: Option<String>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_files() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            max_files: default_max_files(),
        }
    }
}

impl NotifyConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, NotifyError> {
        let config: NotifyConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides for secrets and the bind address.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Ok(token) = std::env::var("WEBHOOK_TOKEN") {
            self.webhook.token = Some(token);
        }
        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            self.bind_address = Some(addr);
        }
    }

    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.http_host.trim().is_empty() {
            return Err(NotifyError::ConfigError(
                "http_host must not be blank".to_string(),
            ));
        }
        if self.notifications.contains(&HandlerKind::Github) && !self.github.has_token() {
            return Err(NotifyError::ConfigError(
                "github notifications are enabled but github.token is not set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> &str {
        self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS)
    }
}

/// Load and parse the configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<NotifyConfig, NotifyError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        NotifyError::ConfigError(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;

    // parse failures, unknown handler kinds included, stay TomlParseError
    let mut config: NotifyConfig = toml::from_str(&config_str)?;
    config.apply_env();
    config.validate()?;

    Ok(config)
}
