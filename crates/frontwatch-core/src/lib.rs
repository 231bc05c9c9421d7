//! # frontwatch-core
//!
//! Shared vocabulary for the frontwatch crates.
//!
//! - **Constants**: endpoint path, heartbeat payloads, reconnect defaults
//! - **Events**: `DashboardEvent`, the envelope the dashboard backend pushes
//!   over its `/ws` channel
//! - **Backoff**: `ReconnectPolicy`, the pure delay/ceiling math used by the
//!   reconnecting client
//! - **Logging**: `init_subscriber` for the `tracing` stack

#![deny(unsafe_code)]

pub mod backoff;
pub mod constants;
pub mod events;
pub mod logging;

pub use backoff::ReconnectPolicy;
pub use events::{DashboardEvent, EventKind};
pub use logging::{LogFormat, init_subscriber};
