//! Per-connection session state.

use agrihub_common::id::{prefix, prefixed_ulid};

use super::events::JoinPayload;
use super::registry::{PresenceRecord, PresenceStatus};

/// State for a single joined WebSocket connection.
pub struct HubSession {
    /// Hub-minted connection id (`conn_`-prefixed ULID); not stable across
    /// reconnects.
    pub connection_id: String,
    /// Logical user id supplied at join (shared across a user's devices).
    pub user_id: String,
    /// Presence info cached at join time.
    pub presence: PresenceRecord,
}

impl HubSession {
    pub fn new(join: JoinPayload) -> Self {
        let connection_id = prefixed_ulid(prefix::CONNECTION);
        let presence = PresenceRecord {
            connection_id: connection_id.clone(),
            user_id: join.user_id.clone(),
            user_name: join.user_name,
            avatar_url: join.avatar_url,
            status: PresenceStatus::Online,
        };
        Self {
            connection_id,
            user_id: join.user_id,
            presence,
        }
    }
}
