use std::time::Duration;

use frontwatch_core::ReconnectPolicy;
use frontwatch_core::constants::HEARTBEAT_INTERVAL;
use serde::{Deserialize, Serialize};

/// Event client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Origin of the dashboard page, e.g. `https://dash.example.com`.
    pub origin: String,
    /// Interval between heartbeats in ms.
    pub heartbeat_interval_ms: u64,
    /// Reconnect backoff and ceiling.
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientSettings {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".into(),
            heartbeat_interval_ms: HEARTBEAT_INTERVAL.as_millis() as u64,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientSettings {
    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
