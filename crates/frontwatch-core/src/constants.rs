//! Package-level constants.

use std::time::Duration;

/// Current version (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "frontwatch";

/// Path of the event channel on the dashboard host.
pub const EVENTS_PATH: &str = "/ws";

/// Text payload the client sends as a liveness ping.
pub const HEARTBEAT_PING: &str = "ping";

/// Text payload the hub answers a ping with.
pub const HEARTBEAT_PONG: &str = "pong";

/// Interval between client heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Base delay of the reconnect backoff.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Reconnect attempts before the client gives up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// WebSocket close code for a normal, intentional close.
pub const CLOSE_NORMAL: u16 = 1000;

/// WebSocket close code reported when a close frame carried no status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// WebSocket close code reported when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
