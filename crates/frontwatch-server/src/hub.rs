//! Event fan-out to connected `WebSocket` clients.
//!
//! Connections are indexed by ID and grouped by name. Every socket joins
//! [`GROUP_ALL`]; [`GROUP_AUTHENTICATED`] is opt-in via [`BroadcastHub::join`].
//! A broadcast pass never blocks on a slow client: a full queue drops the
//! message for that client, a closed queue gets the client pruned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use frontwatch_core::DashboardEvent;
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use crate::connection::{ClientConnection, Delivery};
use crate::errors::Result;

/// Group every connection belongs to.
pub const GROUP_ALL: &str = "all";

/// Group for connections that authenticated.
pub const GROUP_AUTHENTICATED: &str = "authenticated";

#[derive(Default)]
struct Registry {
    connections: HashMap<String, Arc<ClientConnection>>,
    groups: HashMap<String, HashSet<String>>,
}

impl Registry {
    fn remove(&mut self, id: &str) -> bool {
        let removed = self.connections.remove(id).is_some();
        for members in self.groups.values_mut() {
            let _ = members.remove(id);
        }
        self.groups.retain(|_, members| !members.is_empty());
        removed
    }
}

/// Connection registry and broadcaster.
pub struct BroadcastHub {
    registry: RwLock<Registry>,
    max_send_queue: usize,
}

impl BroadcastHub {
    /// Hub whose connections queue up to `max_send_queue` messages each.
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            max_send_queue: max_send_queue.max(1),
        }
    }

    /// Register a new connection in [`GROUP_ALL`] plus `groups`.
    ///
    /// Returns the connection and the receiving end its socket writer drains.
    pub async fn register(
        &self,
        groups: &[&str],
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let connection = Arc::new(ClientConnection::new(tx));
        let id = connection.id.clone();

        let mut registry = self.registry.write().await;
        let _ = registry.connections.insert(id.clone(), Arc::clone(&connection));
        for group in std::iter::once(&GROUP_ALL).chain(groups) {
            let _ = registry
                .groups
                .entry((*group).to_owned())
                .or_default()
                .insert(id.clone());
        }
        debug!(conn_id = %id, total = registry.connections.len(), "connection registered");
        (connection, rx)
    }

    /// Add a registered connection to `group`. Returns `false` for unknown IDs.
    pub async fn join(&self, id: &str, group: &str) -> bool {
        let mut registry = self.registry.write().await;
        if !registry.connections.contains_key(id) {
            return false;
        }
        let _ = registry
            .groups
            .entry(group.to_owned())
            .or_default()
            .insert(id.to_owned());
        true
    }

    /// Take a connection out of `group`.
    pub async fn leave(&self, id: &str, group: &str) -> bool {
        let mut registry = self.registry.write().await;
        let Some(members) = registry.groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(id);
        if members.is_empty() {
            let _ = registry.groups.remove(group);
        }
        removed
    }

    /// Remove a connection from the registry and every group.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.registry.write().await.remove(id);
        if removed {
            debug!(conn_id = %id, "connection removed");
        }
        removed
    }

    /// Send `message` to every connection in `group`.
    ///
    /// Returns how many connections accepted it. Connections whose writer is
    /// gone are pruned after the pass.
    pub async fn broadcast(&self, message: impl Into<Utf8Bytes>, group: &str) -> usize {
        let message = message.into();
        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let registry = self.registry.read().await;
            let Some(members) = registry.groups.get(group) else {
                debug!(group, "broadcast to empty group");
                return 0;
            };
            for id in members {
                let Some(conn) = registry.connections.get(id) else {
                    continue;
                };
                match conn.send(message.clone()) {
                    Delivery::Sent => delivered += 1,
                    Delivery::Dropped => {
                        warn!(conn_id = %id, dropped = conn.drop_count(), "send queue full, dropping message");
                    }
                    Delivery::Closed => closed.push(id.clone()),
                }
            }
        }

        if !closed.is_empty() {
            let mut registry = self.registry.write().await;
            for id in &closed {
                let _ = registry.remove(id);
            }
            debug!(pruned = closed.len(), "pruned closed connections");
        }
        debug!(group, recipients = delivered, "broadcast");
        delivered
    }

    /// Serialise `event` and broadcast it to `group`.
    pub async fn broadcast_event(&self, event: &DashboardEvent, group: &str) -> Result<usize> {
        let json = serde_json::to_string(event)?;
        let recipients = self.broadcast(json, group).await;
        debug!(event_type = %event.kind, recipients, "broadcast event");
        Ok(recipients)
    }

    /// Current fronters changed.
    pub async fn broadcast_fronting_update(&self, fronters: Value) -> Result<usize> {
        self.broadcast_event(&DashboardEvent::fronting_update(fronters), GROUP_ALL)
            .await
    }

    /// Mental state changed.
    pub async fn broadcast_mental_state_update(&self, state: Value) -> Result<usize> {
        self.broadcast_event(&DashboardEvent::mental_state_update(state), GROUP_ALL)
            .await
    }

    /// Member list changed.
    pub async fn broadcast_members_update(&self, members: Vec<Value>) -> Result<usize> {
        self.broadcast_event(&DashboardEvent::members_update(members), GROUP_ALL)
            .await
    }

    /// Ask every client to reload.
    pub async fn broadcast_force_refresh(&self, message: &str) -> Result<usize> {
        self.broadcast_event(&DashboardEvent::force_refresh(message), GROUP_ALL)
            .await
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    /// Number of connections in `group`.
    pub async fn group_size(&self, group: &str) -> usize {
        self.registry
            .read()
            .await
            .groups
            .get(group)
            .map_or(0, HashSet::len)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontwatch_core::EventKind;
    use serde_json::json;

    fn drain(rx: &mut mpsc::Receiver<Utf8Bytes>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg.as_str().to_owned());
        }
        out
    }

    #[tokio::test]
    async fn register_joins_all() {
        let hub = BroadcastHub::default();
        let (conn, _rx) = hub.register(&[]).await;
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.group_size(GROUP_ALL).await, 1);
        assert_eq!(hub.group_size(GROUP_AUTHENTICATED).await, 0);
        assert!(hub.remove(&conn.id).await);
        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.group_size(GROUP_ALL).await, 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_group_only() {
        let hub = BroadcastHub::default();
        let (_anon, mut anon_rx) = hub.register(&[]).await;
        let (authed, mut authed_rx) = hub.register(&[]).await;
        assert!(hub.join(&authed.id, GROUP_AUTHENTICATED).await);

        assert_eq!(hub.broadcast("secret", GROUP_AUTHENTICATED).await, 1);
        assert_eq!(hub.broadcast("hello", GROUP_ALL).await, 2);

        assert_eq!(drain(&mut anon_rx), vec!["hello"]);
        assert_eq!(drain(&mut authed_rx), vec!["secret", "hello"]);
    }

    #[tokio::test]
    async fn broadcast_to_unknown_group_is_empty() {
        let hub = BroadcastHub::default();
        let (_conn, mut rx) = hub.register(&[]).await;
        assert_eq!(hub.broadcast("x", "admins").await, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn closed_connections_are_pruned() {
        let hub = BroadcastHub::default();
        let (_live, mut live_rx) = hub.register(&[GROUP_AUTHENTICATED]).await;
        let (_dead, dead_rx) = hub.register(&[GROUP_AUTHENTICATED]).await;
        drop(dead_rx);

        assert_eq!(hub.broadcast("hello", GROUP_ALL).await, 1);
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.group_size(GROUP_ALL).await, 1);
        assert_eq!(hub.group_size(GROUP_AUTHENTICATED).await, 1);
        assert_eq!(drain(&mut live_rx), vec!["hello"]);
    }

    #[tokio::test]
    async fn full_queue_drops_without_pruning() {
        let hub = BroadcastHub::new(1);
        let (conn, mut rx) = hub.register(&[]).await;

        assert_eq!(hub.broadcast("one", GROUP_ALL).await, 1);
        assert_eq!(hub.broadcast("two", GROUP_ALL).await, 0);
        assert_eq!(conn.drop_count(), 1);
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(drain(&mut rx), vec!["one"]);
    }

    #[tokio::test]
    async fn join_and_leave() {
        let hub = BroadcastHub::default();
        let (conn, _rx) = hub.register(&[]).await;
        assert!(!hub.join("conn_missing", GROUP_AUTHENTICATED).await);
        assert!(hub.join(&conn.id, GROUP_AUTHENTICATED).await);
        assert_eq!(hub.group_size(GROUP_AUTHENTICATED).await, 1);
        assert!(hub.leave(&conn.id, GROUP_AUTHENTICATED).await);
        assert!(!hub.leave(&conn.id, GROUP_AUTHENTICATED).await);
        assert_eq!(hub.group_size(GROUP_AUTHENTICATED).await, 0);
    }

    #[tokio::test]
    async fn event_helpers_send_envelopes() {
        let hub = BroadcastHub::default();
        let (_conn, mut rx) = hub.register(&[]).await;

        let _ = hub.broadcast_fronting_update(json!({"fronters": ["Alex"]})).await.unwrap();
        let _ = hub.broadcast_mental_state_update(json!({"level": 3})).await.unwrap();
        let _ = hub.broadcast_members_update(vec![json!({"id": 1})]).await.unwrap();
        let n = hub.broadcast_force_refresh("reload please").await.unwrap();
        assert_eq!(n, 1);

        let events: Vec<DashboardEvent> = drain(&mut rx)
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::FrontingUpdate,
                EventKind::MentalStateUpdate,
                EventKind::MembersUpdate,
                EventKind::ForceRefresh,
            ]
        );
        assert!(events.iter().all(|e| e.timestamp.is_some()));
        assert_eq!(events[2].members().unwrap().len(), 1);
        assert_eq!(events[3].data["message"], "reload please");
    }
}
