use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A chat message kept as best-effort history. Relay delivery never depends
/// on this record existing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMessage {
    pub id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
