//! Settings types.
//!
//! Every struct uses `#[serde(default)]` so a partial `settings.json`
//! deserialises cleanly; the loader deep-merges the file over
//! [`FrontwatchSettings::default()`] anyway.

mod client;
mod server;

pub use client::ClientSettings;
pub use server::ServerSettings;

use frontwatch_core::LogFormat;
use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontwatchSettings {
    /// Event client (`watch`) settings.
    pub client: ClientSettings,
    /// Broadcast hub (`serve`) settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}
