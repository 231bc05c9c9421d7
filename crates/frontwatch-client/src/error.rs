//! Client error types.

use thiserror::Error;

/// Errors surfaced by the event client.
///
/// Everything except [`ClientError::InvalidEndpoint`] reaches the consumer
/// through the error callback rather than a `Result`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No channel URL can be derived from the configured origin.
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidEndpoint {
        /// The origin as configured.
        origin: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Opening the connection failed.
    #[error("connection failed: {0}")]
    Connect(String),
    /// An established connection failed to read or write.
    #[error("transport error: {0}")]
    Transport(String),
    /// Every reconnect attempt was used up; the client has stopped.
    #[error("failed to reconnect after {attempts} attempts")]
    ReconnectExhausted {
        /// Reconnects made before giving up.
        attempts: u32,
    },
}

impl ClientError {
    /// Whether the client stopped for good after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReconnectExhausted { .. })
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::Connect(_) => "connect",
            Self::Transport(_) => "transport",
            Self::ReconnectExhausted { .. } => "reconnect_exhausted",
        }
    }
}
