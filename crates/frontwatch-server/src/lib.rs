//! # frontwatch-server
//!
//! Axum `WebSocket` broadcast hub: the server side of the dashboard's `/ws`
//! channel.
//!
//! - `GET /ws`: registers the socket in group `all`, answers `"ping"` with
//!   `"pong"`, forwards broadcasts
//! - `GET /health`: liveness and connection count
//! - `POST /api/broadcast`: push a dashboard event to every client
//! - Graceful shutdown via `CancellationToken`: open sockets get a 1001 close

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod health;
pub mod hub;
pub mod server;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use hub::{BroadcastHub, GROUP_ALL, GROUP_AUTHENTICATED};
pub use server::HubServer;
