//! # frontwatch-client
//!
//! Reconnecting event client for the dashboard's `/ws` channel.
//!
//! [`EventClient`] keeps one live connection to `{ws|wss}://{host}/ws`,
//! sends a `"ping"` heartbeat every 30 seconds while open, decodes each
//! inbound message as JSON before handing it to the registered handler, and
//! reconnects after abnormal closes with `1s, 2s, 4s, 8s, 16s` backoff before
//! giving up.
//!
//! The pieces, bottom-up:
//!
//! - [`endpoint`]: derive the channel URL from a page origin
//! - [`lifecycle`]: the sans-IO state machine (attempt counter, directives)
//! - [`transport`]: the `Connector`/`Connection` seam and its
//!   `tokio-tungstenite` implementation
//! - [`callbacks`]: the four consumer callback slots
//! - [`client`]: the async driver that ties them together

#![deny(unsafe_code)]

pub mod callbacks;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod state;
pub mod transport;

#[cfg(test)]
mod mock;

pub use callbacks::ClientCallbacks;
pub use client::EventClient;
pub use config::ClientConfig;
pub use endpoint::events_endpoint;
pub use error::ClientError;
pub use lifecycle::{Directive, Lifecycle};
pub use state::{CloseInfo, ConnectionState};
pub use transport::{Connection, Connector, Frame, WsConnector};
