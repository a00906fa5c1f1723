//! Connection registry: the source of truth for who is online, and the
//! directory of outbound sinks for targeted delivery.
//!
//! One record per live connection. Logical user ids are deliberately NOT
//! unique — the same person on two devices is two independent presences —
//! so lookups by user id go through an explicit multi-map instead of a scan.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use super::events::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
}

/// Presence metadata for one live connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub connection_id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub status: PresenceStatus,
}

struct Connection {
    presence: PresenceRecord,
    tx: UnboundedSender<ServerEvent>,
}

/// Shared registry of all hub connections.
pub struct ConnectionRegistry {
    connections: DashMap<String, Connection>,
    by_user: DashMap<String, HashSet<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// Insert (or overwrite) the record for a connection.
    pub fn register(&self, presence: PresenceRecord, tx: UnboundedSender<ServerEvent>) {
        let connection_id = presence.connection_id.clone();
        let user_id = presence.user_id.clone();
        self.connections
            .insert(connection_id.clone(), Connection { presence, tx });
        self.by_user
            .entry(user_id)
            .or_default()
            .insert(connection_id);
    }

    /// Remove and return the record, or `None` if already gone. Disconnects
    /// can race with explicit leaves, so this must stay idempotent.
    pub fn unregister(&self, connection_id: &str) -> Option<PresenceRecord> {
        let (_, connection) = self.connections.remove(connection_id)?;
        let user_id = connection.presence.user_id.clone();
        let mut empty = false;
        if let Some(mut set) = self.by_user.get_mut(&user_id) {
            set.remove(connection_id);
            empty = set.is_empty();
        }
        if empty {
            self.by_user.remove_if(&user_id, |_, set| set.is_empty());
        }
        Some(connection.presence)
    }

    /// The full online set. Consumers must not rely on ordering.
    pub fn snapshot(&self) -> Vec<PresenceRecord> {
        self.connections
            .iter()
            .map(|entry| entry.value().presence.clone())
            .collect()
    }

    /// All live connections for a logical user id (zero, one, or many).
    pub fn find_by_user(&self, user_id: &str) -> Vec<PresenceRecord> {
        let ids: Vec<String> = match self.by_user.get(user_id) {
            Some(set) => set.iter().cloned().collect(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.connections.get(id).map(|c| c.presence.clone()))
            .collect()
    }

    /// Update one connection's status. Returns false for unknown connections.
    pub fn set_status(&self, connection_id: &str, status: PresenceStatus) -> bool {
        match self.connections.get_mut(connection_id) {
            Some(mut connection) => {
                connection.presence.status = status;
                true
            }
            None => false,
        }
    }

    /// Deliver an event to a single connection. Returns false if the
    /// connection is gone or its session loop has shut down.
    pub fn send_to(&self, connection_id: &str, event: ServerEvent) -> bool {
        match self.connections.get(connection_id) {
            Some(connection) => connection.tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver an event to every connection of a logical user (multi-device).
    /// Returns the number of connections reached; zero is not an error.
    pub fn send_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        let ids: Vec<String> = match self.by_user.get(user_id) {
            Some(set) => set.iter().cloned().collect(),
            None => return 0,
        };
        ids.iter()
            .filter(|id| self.send_to(id, event.clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
