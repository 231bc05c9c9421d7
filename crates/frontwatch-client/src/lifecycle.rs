//! Connection lifecycle state machine.
//!
//! Sans-IO: [`Lifecycle`] consumes connection events (connect started,
//! opened, closed, teardown); closes are answered with a [`Directive`] the
//! driver carries out. It owns the attempt counter and the ceiling check; it never
//! sleeps, spawns, or touches a socket.
//!
//! Attempt counter rules:
//! - starts at 0, reset to 0 by every successful open
//! - on an abnormal close below the ceiling, the delay is computed from the
//!   current count and the count is then incremented by exactly 1
//! - on an abnormal close at the ceiling, the machine moves to `Failed` and
//!   asks the driver to give up (once)
//! - normal closes and closes after teardown never schedule a reconnect

use std::time::Duration;

use frontwatch_core::ReconnectPolicy;

use crate::state::{CloseInfo, ConnectionState};

/// What the driver must do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Wait `delay`, then open a new connection.
    Reconnect {
        /// Backoff delay before the new attempt.
        delay: Duration,
        /// 1-based number of the reconnect being scheduled.
        attempt: u32,
    },
    /// Stop retrying and report a terminal failure.
    GiveUp {
        /// Reconnects made before giving up.
        attempts: u32,
    },
    /// Nothing further to do.
    Stop,
}

/// Sans-IO lifecycle of one client.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    torn_down: bool,
}

impl Lifecycle {
    /// Fresh lifecycle: `Closed`, zero attempts.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Closed,
            attempts: 0,
            torn_down: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reconnect policy in force.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Whether teardown has been requested.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// A connection attempt is starting.
    ///
    /// Returns `false` (and stays put) if the lifecycle is torn down or failed.
    pub fn begin_connect(&mut self) -> bool {
        if self.torn_down || self.state == ConnectionState::Failed {
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    /// The connection opened.
    pub fn on_open(&mut self) {
        self.attempts = 0;
        self.state = ConnectionState::Open;
    }

    /// The connection closed (or a connection attempt failed).
    pub fn on_close(&mut self, close: &CloseInfo) -> Directive {
        if self.state == ConnectionState::Failed {
            return Directive::Stop;
        }
        self.state = ConnectionState::Closed;

        if close.is_normal() || self.torn_down {
            return Directive::Stop;
        }

        if self.policy.allows(self.attempts) {
            let delay = self.policy.delay(self.attempts);
            self.attempts += 1;
            Directive::Reconnect {
                delay,
                attempt: self.attempts,
            }
        } else {
            self.state = ConnectionState::Failed;
            Directive::GiveUp {
                attempts: self.attempts,
            }
        }
    }

    /// The owner asked to shut down.
    ///
    /// An open or connecting channel moves to `Closing`; otherwise the state
    /// is left alone. Any later close is final.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        if matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            self.state = ConnectionState::Closing;
        }
    }

    /// Teardown finished with no connection left to close.
    pub fn finish_teardown(&mut self) {
        self.torn_down = true;
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
    }
}
