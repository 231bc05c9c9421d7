//! End-to-end tests: real sockets against a real hub on loopback.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use frontwatch_client::{ClientCallbacks, ClientConfig, ConnectionState, EventClient};
use frontwatch_core::{DashboardEvent, EventKind};
use frontwatch_server::{HubServer, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a hub on an ephemeral port.
async fn boot_server() -> (SocketAddr, HubServer) {
    let server = HubServer::new(ServerConfig::default());
    let (addr, _handle) = server.listen().await.unwrap();
    (addr, server)
}

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

/// Next text frame.
async fn read_text(ws: &mut WsStream) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

async fn wait_for_connections(server: &HubServer, expected: usize) {
    timeout(TIMEOUT, async {
        while server.hub().connection_count().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timeout waiting for connection count");
}

fn client_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(format!("http://{addr}"))
}

async fn wait_open(client: &EventClient) {
    let mut state = client.subscribe_state();
    let _ = timeout(TIMEOUT, state.wait_for(|s| s.is_open()))
        .await
        .expect("timeout waiting for open")
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw sockets
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_ping_is_answered_with_pong() {
    let (addr, _server) = boot_server().await;
    let mut ws = connect(addr).await;

    ws.send(Message::text("hello")).await.unwrap();
    ws.send(Message::text("ping")).await.unwrap();
    assert_eq!(read_text(&mut ws).await, "pong");
}

#[tokio::test]
async fn e2e_broadcast_reaches_every_socket() {
    let (addr, server) = boot_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_connections(&server, 2).await;

    let recipients = server
        .hub()
        .broadcast_fronting_update(json!({"fronters": ["Sam"]}))
        .await
        .unwrap();
    assert_eq!(recipients, 2);

    for ws in [&mut a, &mut b] {
        let event: Value = serde_json::from_str(&read_text(ws).await).unwrap();
        assert_eq!(event["type"], "fronting_update");
        assert_eq!(event["data"]["fronters"][0], "Sam");
        assert!(event["timestamp"].is_string());
    }
}

#[tokio::test]
async fn e2e_closed_socket_is_unregistered() {
    let (addr, server) = boot_server().await;
    let mut ws = connect(addr).await;
    wait_for_connections(&server, 1).await;

    ws.close(None).await.unwrap();
    wait_for_connections(&server, 0).await;
}

#[tokio::test]
async fn e2e_shutdown_closes_sockets_with_going_away() {
    let (addr, server) = boot_server().await;
    let mut ws = connect(addr).await;
    wait_for_connections(&server, 1).await;

    server.shutdown().cancel();
    let msg = timeout(TIMEOUT, ws.next())
        .await
        .expect("timeout waiting for close")
        .expect("stream closed")
        .expect("ws error");
    match msg {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Away),
        other => panic!("expected close frame, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event client against the hub
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_event_client_receives_broadcasts() {
    let (addr, server) = boot_server().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callbacks = ClientCallbacks::new(move |event: DashboardEvent| {
        let _ = tx.send(event);
    });

    let client = EventClient::open(client_config(addr), callbacks).unwrap();
    wait_open(&client).await;
    wait_for_connections(&server, 1).await;

    let _ = server
        .hub()
        .broadcast_members_update(vec![json!({"id": "m1"}), json!({"id": "m2"})])
        .await
        .unwrap();

    let event = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::MembersUpdate);
    assert_eq!(event.members().unwrap().len(), 2);

    client.close().await;
    wait_for_connections(&server, 0).await;
}

#[tokio::test]
async fn e2e_heartbeat_pongs_are_not_delivered() {
    let (addr, server) = boot_server().await;
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    let callbacks = ClientCallbacks::new(move |event: DashboardEvent| {
        let _ = msg_tx.send(event);
    })
    .with_error(move |e| {
        let _ = err_tx.send(e);
    });

    let config = client_config(addr).with_heartbeat_interval(Duration::from_millis(20));
    let client = EventClient::open(config, callbacks).unwrap();
    wait_open(&client).await;
    wait_for_connections(&server, 1).await;

    // Several heartbeat round trips.
    sleep(Duration::from_millis(150)).await;
    assert!(client.send("ping"));
    let _ = server.hub().broadcast_force_refresh("reload").await.unwrap();

    let event = timeout(TIMEOUT, msg_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::ForceRefresh);
    assert!(msg_rx.try_recv().is_err());
    assert!(err_rx.try_recv().is_err());
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test]
async fn e2e_event_client_against_dead_port_reports_errors() {
    // Bind and release a port so nothing is listening on it.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();
    let callbacks = ClientCallbacks::new(|_: DashboardEvent| {}).with_error(move |e| {
        let _ = err_tx.send(e);
    });

    let client = EventClient::open(client_config(addr), callbacks).unwrap();
    let err = timeout(TIMEOUT, err_rx.recv()).await.unwrap().unwrap();
    assert!(!err.is_terminal());
    assert!(!client.is_connected());
    client.close().await;
}
