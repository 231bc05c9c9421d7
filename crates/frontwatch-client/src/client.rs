//! The event client and its driver task.
//!
//! [`EventClient`] is the handle the consumer holds. All connection work runs
//! on a spawned driver task: it opens the channel, runs the heartbeat, decodes
//! inbound payloads, and carries out the [`Lifecycle`]'s directives. The
//! handle and the driver share three things: a state watch, a link watch,
//! and a cancellation token.
//!
//! The link holds the outbound sender of the connection that is open right
//! now, or `None`. Every connection gets a fresh unbounded queue; the driver
//! clears the link the moment a connection ends, before anything else, and
//! drops that queue with the connection. A payload accepted by `send` can
//! therefore only ever reach the connection that was open when it was sent.

use std::sync::Arc;
use std::time::Duration;

use frontwatch_core::constants::HEARTBEAT_PONG;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};
use url::Url;

use crate::callbacks::ClientCallbacks;
use crate::config::ClientConfig;
use crate::endpoint::events_endpoint;
use crate::error::ClientError;
use crate::lifecycle::{Directive, Lifecycle};
use crate::state::{CloseInfo, ConnectionState};
use crate::transport::{Connection, Connector, Frame, WsConnector};

/// Outbound queue of the open connection, if any.
type Link = Option<mpsc::UnboundedSender<String>>;

/// Handle to a reconnecting event channel.
///
/// Dropping the handle tears the client down, same as [`EventClient::close`]
/// without waiting.
#[derive(Debug)]
pub struct EventClient {
    endpoint: Url,
    state: watch::Receiver<ConnectionState>,
    link: watch::Receiver<Link>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl EventClient {
    /// Connect to the channel for `config.origin` over `tokio-tungstenite`.
    ///
    /// Returns immediately; the first connection attempt runs on the driver
    /// task. Must be called from within a Tokio runtime.
    pub fn open<E>(config: ClientConfig, callbacks: ClientCallbacks<E>) -> Result<Self, ClientError>
    where
        E: DeserializeOwned + Send + 'static,
    {
        Self::open_with(config, WsConnector::new(), callbacks)
    }

    /// Like [`EventClient::open`], with a caller-supplied connector.
    pub fn open_with<E, C>(
        config: ClientConfig,
        connector: C,
        callbacks: ClientCallbacks<E>,
    ) -> Result<Self, ClientError>
    where
        E: DeserializeOwned + Send + 'static,
        C: Connector,
    {
        let endpoint = events_endpoint(&config.origin)?;
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let (link_tx, link) = watch::channel(None);
        let cancel = CancellationToken::new();

        let driver = Driver {
            endpoint: endpoint.clone(),
            lifecycle: Lifecycle::new(config.reconnect),
            config,
            connector: Arc::new(connector),
            callbacks,
            state_tx,
            link: link_tx,
            cancel: cancel.clone(),
        };
        let span = info_span!("event_client", endpoint = %endpoint);
        let driver = tokio::spawn(driver.run().instrument(span));

        Ok(Self {
            endpoint,
            state,
            link,
            cancel,
            driver: Some(driver),
        })
    }

    /// Channel URL this client connects to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether the channel is open right now.
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Queue a text payload for transmission.
    ///
    /// Returns `true` whenever the channel is open; otherwise returns
    /// `false` and drops the payload. Nothing is carried over to a later
    /// connection.
    pub fn send(&self, payload: impl Into<String>) -> bool {
        // The borrow holds the link's read lock, so the driver cannot swap
        // connections between the check and the push.
        let link = self.link.borrow();
        let sent = link
            .as_ref()
            .is_some_and(|outbound| outbound.send(payload.into()).is_ok());
        if !sent {
            debug!(state = %self.state(), "dropping send, channel not open");
        }
        sent
    }

    /// Tear down: cancel any pending reconnect, close an open channel with
    /// code 1000, and wait for the driver to finish.
    pub async fn close(mut self) {
        self.cancel.cancel();
        self.closed().await;
    }

    /// Wait until the driver stops, either after teardown or after giving up.
    pub async fn closed(&mut self) {
        if let Some(driver) = self.driver.as_mut() {
            if let Err(e) = driver.await {
                error!(error = %e, "event client driver panicked");
            }
            self.driver = None;
        }
    }
}

impl Drop for EventClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

struct Driver<E> {
    endpoint: Url,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    callbacks: ClientCallbacks<E>,
    lifecycle: Lifecycle,
    state_tx: watch::Sender<ConnectionState>,
    link: watch::Sender<Link>,
    cancel: CancellationToken,
}

impl<E: DeserializeOwned + Send + 'static> Driver<E> {
    async fn run(mut self) {
        loop {
            if !self.lifecycle.begin_connect() {
                break;
            }
            self.publish();

            let connector = Arc::clone(&self.connector);
            let connected = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = connector.connect(&self.endpoint) => Some(result),
            };

            let close = match connected {
                None => {
                    self.shut_down();
                    break;
                }
                Some(Ok(conn)) => self.run_session(conn).await,
                Some(Err(e)) => {
                    warn!(error = %e, attempts = self.lifecycle.attempts(), "connection attempt failed");
                    self.callbacks.error(e);
                    CloseInfo::abnormal("connection failed")
                }
            };

            let directive = self.lifecycle.on_close(&close);
            self.publish();
            info!(code = close.code, reason = %close.reason, "event channel closed");
            self.callbacks.closed(close);

            match directive {
                Directive::Reconnect { delay, attempt } => {
                    info!(
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        attempt,
                        max_attempts = self.lifecycle.policy().max_attempts,
                        "scheduling reconnect"
                    );
                    let cancelled = tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => true,
                        () = tokio::time::sleep(delay) => false,
                    };
                    if cancelled {
                        self.shut_down();
                        break;
                    }
                }
                Directive::GiveUp { attempts } => {
                    error!(attempts, "reconnect attempts exhausted, giving up");
                    self.callbacks
                        .error(ClientError::ReconnectExhausted { attempts });
                    break;
                }
                Directive::Stop => break,
            }
        }
        debug!(state = %self.lifecycle.state(), "event client driver stopped");
    }

    /// One open connection, from open to close.
    async fn run_session(&mut self, mut conn: Box<dyn Connection>) -> CloseInfo {
        let (outbound_tx, mut outbound) = mpsc::unbounded_channel();
        self.lifecycle.on_open();
        let _ = self.link.send_replace(Some(outbound_tx));
        self.publish();
        info!("event channel open");
        self.callbacks.opened();

        let period = self.config.heartbeat_interval.max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let close = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    self.unlink();
                    self.lifecycle.teardown();
                    self.publish();
                    let close = CloseInfo::normal("client shutting down");
                    if let Err(e) = conn.close(close.clone()).await {
                        debug!(error = %e, "close handshake failed");
                    }
                    break close;
                }
                frame = conn.recv() => match frame {
                    Some(Ok(Frame::Text(text))) => self.deliver(text.as_bytes()),
                    Some(Ok(Frame::Binary(bytes))) => self.deliver(&bytes),
                    Some(Ok(Frame::Close(close))) => {
                        break close.unwrap_or_else(CloseInfo::no_status);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "event channel read failed");
                        self.callbacks.error(e);
                        break CloseInfo::abnormal("transport error");
                    }
                    None => break CloseInfo::abnormal("connection lost"),
                },
                Some(payload) = outbound.recv() => {
                    if let Err(e) = conn.send_text(payload).await {
                        warn!(error = %e, "send failed");
                        self.callbacks.error(e);
                    }
                }
                _ = heartbeat.tick() => {
                    trace!("sending heartbeat");
                    if let Err(e) = conn.send_text(self.config.heartbeat_payload.clone()).await {
                        debug!(error = %e, "heartbeat send failed");
                    }
                }
            }
        };

        self.unlink();
        outbound.close();
        let mut discarded = 0_usize;
        while outbound.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "discarded sends queued for the closed connection");
        }
        close
    }

    /// Stop accepting sends for the current connection.
    fn unlink(&self) {
        let _ = self.link.send_replace(None);
    }

    fn deliver(&mut self, raw: &[u8]) {
        if raw == HEARTBEAT_PONG.as_bytes() {
            trace!("heartbeat acknowledged");
            return;
        }
        match serde_json::from_slice::<E>(raw) {
            Ok(event) => self.callbacks.message(event),
            Err(e) => warn!(error = %e, len = raw.len(), "dropping undecodable event"),
        }
    }

    fn shut_down(&mut self) {
        self.lifecycle.teardown();
        self.lifecycle.finish_teardown();
        self.publish();
    }

    fn publish(&self) {
        let next = self.lifecycle.state();
        let _ = self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
