//! Events pushed by the dashboard backend over its `/ws` channel.
//!
//! Every broadcast shares one envelope:
//!
//! ```json
//! {"type": "fronting_update", "timestamp": "2026-01-01T00:00:00Z", "data": {...}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Kind of dashboard update carried by an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The set of fronting members changed.
    FrontingUpdate,
    /// The system's mental state changed.
    MentalStateUpdate,
    /// The member list changed.
    MembersUpdate,
    /// An admin asked every client to reload.
    ForceRefresh,
    /// A kind this build does not know about.
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrontingUpdate => "fronting_update",
            Self::MentalStateUpdate => "mental_state_update",
            Self::MembersUpdate => "members_update",
            Self::ForceRefresh => "force_refresh",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope of a dashboard broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardEvent {
    /// Update kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// When the backend emitted the event. Missing on hand-built payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Kind-specific payload. Always an object on the wire; `{}` when empty.
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl DashboardEvent {
    /// Build an event stamped with the current UTC time.
    ///
    /// A `null` payload is normalised to `{}`.
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            timestamp: Some(Utc::now()),
            data: if data.is_null() { empty_object() } else { data },
        }
    }

    /// Fronting members changed; `fronters` is the backend's fronters payload.
    pub fn fronting_update(fronters: Value) -> Self {
        Self::new(EventKind::FrontingUpdate, fronters)
    }

    /// Mental state changed.
    pub fn mental_state_update(state: Value) -> Self {
        Self::new(EventKind::MentalStateUpdate, state)
    }

    /// Member list changed; wrapped as `{"members": [...]}`.
    pub fn members_update(members: Vec<Value>) -> Self {
        Self::new(EventKind::MembersUpdate, json!({ "members": members }))
    }

    /// Admin-initiated reload of every client.
    pub fn force_refresh(message: &str) -> Self {
        Self::new(EventKind::ForceRefresh, json!({ "message": message }))
    }

    /// Members carried by a `members_update`, if any.
    pub fn members(&self) -> Option<&Vec<Value>> {
        match self.kind {
            EventKind::MembersUpdate => self.data.get("members")?.as_array(),
            _ => None,
        }
    }
}
