use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a labour post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LabourStatus {
    Active,
    Filled,
    Closed,
}

/// A labour-marketplace post. `labour_count` is the number of open slots
/// remaining; once it reaches zero the post flips to `Filled`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabourPost {
    pub id: String,
    pub farmer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<String>,
    pub work_type: String,
    pub location: String,
    pub duration: String,
    pub offered_wage: i64,
    pub labour_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: LabourStatus,
    pub created_at: DateTime<Utc>,
}
