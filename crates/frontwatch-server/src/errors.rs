//! Server error types.

use thiserror::Error;

/// Errors raised by the broadcast hub.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address as configured.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event could not be serialised.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for hub operations.
pub type Result<T> = std::result::Result<T, ServerError>;
