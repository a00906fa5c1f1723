//! Wire-format events for the hub WebSocket.
//!
//! Every frame is `{"event": "<name>", "data": {...}}`. The event catalogue
//! is a closed pair of enums — adding a kind means adding a variant, and the
//! dispatch match in `server.rs` is checked at compile time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::call_log::CallKind;

use super::registry::{PresenceRecord, PresenceStatus};

// ---------------------------------------------------------------------------
// Client → Hub
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// First event on a fresh socket; everything before it is ignored.
    Join(JoinPayload),
    StatusUpdate(StatusUpdatePayload),
    ChatMessage(ChatMessagePayload),
    /// Post entity already durably created over REST; relay only.
    FeedPost(Value),
    /// Vote result already applied over REST; relay only.
    FeedVote(Value),
    PaymentNotice(PaymentPayload),
    LoanNotice(Value),
    CallOffer(CallOfferPayload),
    CallAnswer(CallAnswerPayload),
    CallReject(CallRefPayload),
    IceCandidate(IceCandidatePayload),
    CallEnd(CallRefPayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    pub text: String,
    pub sender_display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Logical user id of the recipient, not a connection id.
    pub recipient_id: String,
    pub amount: f64,
    pub from_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOfferPayload {
    /// Logical user id of the callee; the hub resolves their connections.
    pub callee_id: String,
    pub kind: CallKind,
    pub sdp_offer: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnswerPayload {
    pub call_id: String,
    pub sdp_answer: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRefPayload {
    pub call_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub call_id: String,
    pub candidate: Value,
}

// ---------------------------------------------------------------------------
// Hub → Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full presence snapshot, pushed to everyone after every change.
    OnlineUsers(Vec<PresenceRecord>),
    ChatMessage(ChatMessagePayload),
    FeedPost(Value),
    FeedVote(Value),
    PaymentNotice(PaymentPayload),
    LoanNotice(Value),
    LabourApplied(LabourAppliedPayload),
    CallOffer(CallOfferNotice),
    #[serde(rename_all = "camelCase")]
    CallAnswer { call_id: String, sdp_answer: Value },
    #[serde(rename_all = "camelCase")]
    CallRejected { call_id: String },
    /// Another device of the same user accepted first.
    #[serde(rename_all = "camelCase")]
    CallClaimed { call_id: String },
    #[serde(rename_all = "camelCase")]
    CallEnded { call_id: String },
    /// Soft failure reported to the caller (callee offline, busy, no answer).
    #[serde(rename_all = "camelCase")]
    CallUnavailable {
        #[serde(skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    IceCandidate { call_id: String, candidate: Value },
    Error(ErrorNotice),
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error(ErrorNotice {
            code: code.to_string(),
            message: message.into(),
        })
    }
}

/// Incoming-call notice delivered to every connection of the callee.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOfferNotice {
    pub call_id: String,
    pub from: PresenceRecord,
    pub kind: CallKind,
    pub sdp_offer: Value,
}

/// Broadcast after a labour slot is claimed over REST.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabourAppliedPayload {
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<String>,
    pub farmer_name: String,
    pub work_type: String,
    pub applicant_name: String,
    pub remaining_count: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub code: String,
    pub message: String,
}
