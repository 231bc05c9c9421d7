//! `WebSocket` client connection state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Outcome of queueing one message for a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the socket writer.
    Sent,
    /// Queue full; the message was dropped for this connection only.
    Dropped,
    /// The writer is gone; the connection should be pruned.
    Closed,
}

/// A connected `WebSocket` client.
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique connection ID (`conn_<uuid v7>`).
    pub id: String,
    tx: mpsc::Sender<Utf8Bytes>,
    /// When this connection was established.
    pub connected_at: Instant,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection with a fresh ID.
    pub fn new(tx: mpsc::Sender<Utf8Bytes>) -> Self {
        Self::with_id(format!("conn_{}", Uuid::now_v7()), tx)
    }

    /// Create a connection with an explicit ID.
    pub fn with_id(id: String, tx: mpsc::Sender<Utf8Bytes>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a text message for the socket writer. Never blocks.
    pub fn send(&self, message: Utf8Bytes) -> Delivery {
        match self.tx.try_send(message) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Whether the socket writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
