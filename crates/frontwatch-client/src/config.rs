//! Client configuration.

use std::time::Duration;

use frontwatch_core::ReconnectPolicy;
use frontwatch_core::constants::{HEARTBEAT_INTERVAL, HEARTBEAT_PING};

/// Configuration for an [`EventClient`](crate::EventClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin of the dashboard page; the channel URL is derived from it.
    pub origin: String,
    /// Interval between heartbeats while open.
    pub heartbeat_interval: Duration,
    /// Text payload of each heartbeat.
    pub heartbeat_payload: String,
    /// Reconnect backoff and ceiling.
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".into(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_payload: HEARTBEAT_PING.into(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults for everything but the origin.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// Override the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Override the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}
