//! Scripted transport for driver tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::error::ClientError;
use crate::state::CloseInfo;
use crate::transport::{Connection, Connector, Frame};

/// How the connector answers one connect call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Plan {
    Refuse,
    Accept,
}

/// What the client wrote to a mock connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    Close(CloseInfo),
}

/// Test side of an accepted connection. Dropping `to_client` ends the
/// client's stream without a close frame.
pub(crate) struct MockPeer {
    pub to_client: mpsc::UnboundedSender<Result<Frame, ClientError>>,
    pub from_client: mpsc::UnboundedReceiver<Sent>,
}

impl MockPeer {
    pub fn text(&self, text: &str) {
        let _ = self.to_client.send(Ok(Frame::Text(text.into())));
    }

    pub fn close(&self, close: Option<CloseInfo>) {
        let _ = self.to_client.send(Ok(Frame::Close(close)));
    }
}

struct Shared {
    plan: Mutex<VecDeque<Plan>>,
    fallback: Plan,
    connects: AtomicUsize,
    connect_times: Mutex<Vec<Instant>>,
    peers: mpsc::UnboundedSender<MockPeer>,
}

#[derive(Clone)]
pub(crate) struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    /// Connector that follows `plan`, then answers `fallback` forever.
    pub fn new(plan: &[Plan], fallback: Plan) -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let shared = Shared {
            plan: Mutex::new(plan.iter().copied().collect()),
            fallback,
            connects: AtomicUsize::new(0),
            connect_times: Mutex::new(Vec::new()),
            peers,
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            peer_rx,
        )
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Gaps between consecutive connect calls.
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let times = self.shared.connect_times.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn Connection>, ClientError> {
        let _ = self.shared.connects.fetch_add(1, Ordering::SeqCst);
        self.shared.connect_times.lock().unwrap().push(Instant::now());
        let plan = self
            .shared
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.shared.fallback);

        match plan {
            Plan::Refuse => Err(ClientError::Connect("connection refused".into())),
            Plan::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let _ = self.shared.peers.send(MockPeer {
                    to_client,
                    from_client,
                });
                Ok(Box::new(MockConnection { inbound, outbound }))
            }
        }
    }
}

struct MockConnection {
    inbound: mpsc::UnboundedReceiver<Result<Frame, ClientError>>,
    outbound: mpsc::UnboundedSender<Sent>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.outbound
            .send(Sent::Text(text))
            .map_err(|_| ClientError::Transport("peer gone".into()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ClientError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self, close: CloseInfo) -> Result<(), ClientError> {
        let _ = self.outbound.send(Sent::Close(close));
        Ok(())
    }
}
