use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_core::{Event, Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::NotifyError;

const DEFAULT_MAX_LOG_FILES: usize = 5;
const MAX_LOG_MEMORY_BYTES: usize = 512 * 1024; // 512KB

/// Only events emitted by this crate end up in the notification log.
const CRATE_TARGET: &str = env!("CARGO_PKG_NAME");

#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub source: LogSource,
    pub message: String,
}

impl LogEntry {
    fn size(&self) -> usize {
        std::mem::size_of::<LogEntry>() + self.message.len() + self.level.len()
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Dispatch,
    Delivery,
    Targets,
    SystemEvent,
}

impl LogSource {
    fn from_target(target: &str) -> Self {
        match target {
            t if t.contains("::dispatcher") => LogSource::Dispatch,
            t if t.contains("::outcome") || t.contains("::handlers") => LogSource::Delivery,
            t if t.contains("::targets") => LogSource::Targets,
            _ => LogSource::SystemEvent,
        }
    }
}

pub struct FileLogger {
    log_directory: PathBuf,
    max_files: usize,
}

impl FileLogger {
    pub fn new(log_directory: PathBuf) -> Self {
        Self {
            log_directory,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard), NotifyError> {
        std::fs::create_dir_all(&self.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("notify_logs")
            .max_log_files(self.max_files)
            .build(&self.log_directory)
            .map_err(|e| NotifyError::ConfigError(format!("Failed to create log file: {}", e)))?;

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Bounded in-memory buffer of recent log entries
pub struct NotificationLog {
    logs: VecDeque<LogEntry>,
    max_total_memory_size: usize,
    total_size: usize,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::with_capacity_bytes(MAX_LOG_MEMORY_BYTES)
    }

    pub fn with_capacity_bytes(max_total_memory_size: usize) -> Self {
        Self {
            logs: VecDeque::new(),
            max_total_memory_size,
            total_size: 0,
        }
    }

    pub fn add_log_entry(&mut self, entry: LogEntry) {
        let entry_size = entry.size();

        // Remove oldest entries if we would exceed the memory limit
        while !self.logs.is_empty() && self.total_size + entry_size > self.max_total_memory_size {
            if let Some(evicted) = self.logs.pop_front() {
                self.total_size -= evicted.size();
            }
        }

        self.total_size += entry_size;
        self.logs.push_back(entry);
    }

    /// Up to `limit` most recent entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let skip = self.logs.len().saturating_sub(limit);
        self.logs.iter().skip(skip).cloned().collect()
    }

    /// Up to `limit` most recent entries at exactly `level`, oldest first.
    pub fn recent_at_level(&self, level: Level, limit: usize) -> Vec<LogEntry> {
        let level = level.to_string();
        let mut entries: Vec<LogEntry> = self
            .logs
            .iter()
            .rev()
            .filter(|entry| entry.level == level)
            .take(limit)
            .cloned()
            .collect();
        entries.reverse();
        entries
    }

    pub fn messages(&self) -> Vec<String> {
        self.logs.iter().map(|entry| entry.message.clone()).collect()
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to extract log message
#[derive(Default)]
struct LogEntryVisitor {
    message: String,
}

impl tracing::field::Visit for LogEntryVisitor {
    fn record_debug(&mut self, field: &tracing_core::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

/// Tracing layer feeding [`NotificationLog`]
#[derive(Clone, Default)]
pub struct NotificationLogLayer {
    log: Arc<Mutex<NotificationLog>>,
}

impl NotificationLogLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.log
            .lock()
            .map(|log| log.recent(limit))
            .unwrap_or_default()
    }

    pub fn recent_at_level(&self, level: Level, limit: usize) -> Vec<LogEntry> {
        self.log
            .lock()
            .map(|log| log.recent_at_level(level, limit))
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.log
            .lock()
            .map(|log| log.messages())
            .unwrap_or_default()
    }

    /// True if any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for NotificationLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(CRATE_TARGET) {
            return;
        }

        let mut visitor = LogEntryVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            source: LogSource::from_target(metadata.target()),
            message: visitor.message,
        };

        if let Ok(mut log) = self.log.lock() {
            log.add_log_entry(entry);
        }
    }
}

/// Install console, optional file and in-memory logging.
///
/// The returned guard must be held for as long as file logging should flush.
pub fn setup_logging(
    config: &LoggingConfig,
) -> Result<(NotificationLogLayer, Option<WorkerGuard>), NotifyError> {
    let log_layer = NotificationLogLayer::new();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let (writer, guard) = FileLogger::new(PathBuf::from(dir))
                .with_max_files(config.max_files)
                .setup_file_logging()?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false); // Disable ANSI colors for file logs
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer.clone())
        .with(tracing_subscriber::fmt::layer()) // Console output
        .with(file_layer)
        .try_init()
        .map_err(|e| NotifyError::ConfigError(format!("Failed to initialize logging: {}", e)))?;

    Ok((log_layer, guard))
}
