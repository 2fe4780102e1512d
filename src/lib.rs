pub mod api;
pub mod auth;
pub mod build;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handlers;
pub mod job;
pub mod logging;
pub mod outcome;
pub mod payload;
pub mod registry;
pub mod targets;
pub mod transport;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use crate::config::NotifyConfig;
use crate::dispatcher::{DeliveryEvent, Dispatcher};
use crate::logging::NotificationLogLayer;

/// Capacity of the live outcome channel. Slow subscribers skip what they miss.
pub const DELIVERY_CHANNEL_CAPACITY: usize = 256;

pub struct AppState {
    pub config: NotifyConfig,
    pub dispatcher: Dispatcher,
    pub delivery_events: broadcast::Sender<DeliveryEvent>,
    pub log_layer: NotificationLogLayer,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire `dispatcher` to a fresh outcome channel.
    pub fn new(config: NotifyConfig, dispatcher: Dispatcher, log_layer: NotificationLogLayer) -> Self {
        let (delivery_events, _) = broadcast::channel(DELIVERY_CHANNEL_CAPACITY);
        Self {
            config,
            dispatcher: dispatcher.with_events(delivery_events.clone()),
            delivery_events,
            log_layer,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
