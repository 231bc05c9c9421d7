//! Axum router and listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Json, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use frontwatch_core::constants::{EVENTS_PATH, HEARTBEAT_PING, HEARTBEAT_PONG};
use frontwatch_core::{DashboardEvent, EventKind};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ServerConfig;
use crate::connection::Delivery;
use crate::errors::{Result, ServerError};
use crate::health::{self, HealthResponse};
use crate::hub::{BroadcastHub, GROUP_ALL};

/// Shared state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry.
    pub hub: Arc<BroadcastHub>,
    /// When the server started.
    pub start_time: Instant,
    shutdown: CancellationToken,
}

/// The broadcast hub server.
pub struct HubServer {
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    start_time: Instant,
    shutdown: CancellationToken,
}

impl HubServer {
    /// Create a server; nothing is bound until [`HubServer::listen`].
    pub fn new(config: ServerConfig) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.max_send_queue));
        Self {
            config,
            hub,
            start_time: Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            start_time: self.start_time,
            shutdown: self.shutdown.clone(),
        };
        Router::new()
            .route("/health", get(health_handler))
            .route(EVENTS_PATH, get(ws_handler))
            .route("/api/broadcast", post(broadcast_handler))
            .with_state(state)
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address (port 0 resolves here) and the serve task,
    /// which ends after [`HubServer::shutdown`] is cancelled.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>)> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "broadcast hub listening");

        let router = self.router();
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "broadcast hub server error");
            }
            info!("broadcast hub stopped");
        });
        Ok((local_addr, handle))
    }

    /// Connection registry, for pushing events from the host process.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Cancelling this token stops the listener and closes every socket.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.hub.connection_count().await;
    Json(health::health_check(state.start_time, connections))
}

/// Body of `POST /api/broadcast`.
#[derive(Debug, Deserialize)]
struct BroadcastRequest {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Serialize)]
struct BroadcastResponse {
    recipients: usize,
}

/// POST /api/broadcast
async fn broadcast_handler(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> std::result::Result<Json<BroadcastResponse>, (axum::http::StatusCode, String)> {
    let event = DashboardEvent::new(request.kind, request.data);
    match state.hub.broadcast_event(&event, GROUP_ALL).await {
        Ok(recipients) => Ok(Json(BroadcastResponse { recipients })),
        Err(e) => {
            warn!(error = %e, "broadcast request failed");
            Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One socket: a writer task fed by the hub, a reader answering heartbeats.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn, mut rx) = state.hub.register(&[]).await;
    let conn_id = conn.id.clone();
    info!(conn_id = %conn_id, "websocket client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let shutdown = state.shutdown.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                () = shutdown.cancelled() => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: "server shutting down".into(),
                    };
                    let _ = ws_tx.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    let reader_conn = Arc::clone(&conn);
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) if text.as_str() == HEARTBEAT_PING => {
                    trace!(conn_id = %reader_conn.id, "heartbeat");
                    if reader_conn.send(HEARTBEAT_PONG.into()) == Delivery::Closed {
                        break;
                    }
                }
                Message::Text(text) => {
                    debug!(conn_id = %reader_conn.id, len = text.len(), "ignoring inbound text");
                }
                Message::Close(_) => break,
                // axum answers protocol pings itself
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    let _ = state.hub.remove(&conn_id).await;
    info!(
        conn_id = %conn_id,
        age_secs = conn.age().as_secs(),
        dropped = conn.drop_count(),
        "websocket client disconnected"
    );
}
