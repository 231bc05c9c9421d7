//! Transport seam.
//!
//! The driver only talks to [`Connector`] and [`Connection`]. Production
//! code uses [`WsConnector`] (`tokio-tungstenite`); tests plug in scripted
//! connections.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::state::CloseInfo;

/// An inbound frame as the driver sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text payload.
    Text(String),
    /// Binary payload.
    Binary(Vec<u8>),
    /// The peer closed; `None` when its close frame carried no status.
    Close(Option<CloseInfo>),
}

/// One open channel.
#[async_trait]
pub trait Connection: Send {
    /// Transmit a text payload.
    async fn send_text(&mut self, text: String) -> Result<(), ClientError>;

    /// Next inbound frame, or `None` once the stream has ended.
    ///
    /// Must be cancel-safe: the driver races it against timers.
    async fn recv(&mut self) -> Option<Result<Frame, ClientError>>;

    /// Close the channel with the given code and reason.
    async fn close(&mut self, close: CloseInfo) -> Result<(), ClientError>;
}

/// Opens channels to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new channel to `url`.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, ClientError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `tokio-tungstenite` connector (`ws://` and `wss://`).
#[derive(Clone, Copy, Debug)]
pub struct WsConnector;

impl WsConnector {
    /// Create the connector, installing the `ring` TLS provider if no
    /// process-wide provider is set yet.
    pub fn new() -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, ClientError> {
        let (ws, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        debug!(url = %url, status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WsConnection { ws }))
    }
}

struct WsConnection {
    ws: WsStream,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, ClientError>> {
        loop {
            let message = match self.ws.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(ClientError::Transport(e.to_string()))),
            };
            let frame = match message {
                Message::Text(text) => Frame::Text(text.as_str().to_owned()),
                Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
                Message::Close(frame) => Frame::Close(frame.map(|f| {
                    CloseInfo::new(u16::from(f.code), f.reason.as_str())
                })),
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self, close: CloseInfo) -> Result<(), ClientError> {
        let frame = CloseFrame {
            code: CloseCode::from(close.code),
            reason: close.reason.into(),
        };
        self.ws
            .close(Some(frame))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}
