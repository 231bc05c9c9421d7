//! # frontwatch-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`FrontwatchSettings::default()`]
//! 2. **User file**: `~/.frontwatch/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `FRONTWATCH_*` overrides (highest priority)
//!
//! Command-line flags of the binary are applied on top of the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
