//! Connection state and close information.

use frontwatch_core::constants::{CLOSE_ABNORMAL, CLOSE_NORMAL, CLOSE_NO_STATUS};

/// Lifecycle state of the client's connection.
///
/// `Connecting → Open → Closing → Closed`; an abnormal `Closed` goes back to
/// `Connecting` after the backoff delay, or to `Failed` once the attempt
/// ceiling is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is fully open.
    Open,
    /// An intentional close is in progress.
    Closing,
    /// No connection; a reconnect may be pending.
    Closed,
    /// Reconnect attempts are exhausted. Terminal.
    Failed,
}

impl ConnectionState {
    /// Whether sends are currently transmitted.
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Whether the client will never connect again from this state.
    pub fn is_terminal(self) -> bool {
        self == Self::Failed
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why a connection ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Close with an explicit code.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Normal, intentional close (1000).
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_NORMAL, reason)
    }

    /// Connection lost without a close frame (1006).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    /// Close frame that carried no status code (1005).
    pub fn no_status() -> Self {
        Self::new(CLOSE_NO_STATUS, "")
    }

    /// Whether this close was intentional and must not be retried.
    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_NORMAL
    }
}
