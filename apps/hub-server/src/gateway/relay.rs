//! Routing for non-call domain events: fan-out broadcast or targeted emit.
//!
//! The relay is never the source of truth — feed posts and votes are durably
//! written over REST before the client emits the notification, and chat
//! history persistence is best-effort.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use agrihub_common::id::{prefix, prefixed_ulid};

use crate::models::message::CommunityMessage;
use crate::store::CommunityStore;

use super::events::{ChatMessagePayload, LabourAppliedPayload, PaymentPayload, ServerEvent};
use super::fanout::HubBroadcast;
use super::registry::ConnectionRegistry;

pub struct EventRelay {
    registry: Arc<ConnectionRegistry>,
    broadcast: HubBroadcast,
    store: Arc<dyn CommunityStore>,
}

impl EventRelay {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broadcast: HubBroadcast,
        store: Arc<dyn CommunityStore>,
    ) -> Self {
        Self {
            registry,
            broadcast,
            store,
        }
    }

    /// Chat goes to everyone but the sender. History is written off the
    /// relay path; a failed write never blocks or fails delivery.
    pub fn chat_message(&self, origin_conn_id: &str, payload: ChatMessagePayload) {
        self.broadcast
            .dispatch(Some(origin_conn_id), ServerEvent::ChatMessage(payload.clone()));

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let message = CommunityMessage {
                id: prefixed_ulid(prefix::MESSAGE),
                author_name: payload.sender_display_name,
                content: payload.text,
                created_at: Utc::now(),
            };
            if let Err(err) = store.insert_message(message).await {
                tracing::error!(?err, "chat history write failed");
            }
        });
    }

    /// Post entity was already durably created; this is pure notification.
    pub fn feed_post(&self, origin_conn_id: &str, post: Value) {
        self.broadcast
            .dispatch(Some(origin_conn_id), ServerEvent::FeedPost(post));
    }

    /// Vote result was already applied; this is pure notification.
    pub fn feed_vote(&self, origin_conn_id: &str, vote: Value) {
        self.broadcast
            .dispatch(Some(origin_conn_id), ServerEvent::FeedVote(vote));
    }

    /// Targeted to every device of the recipient. An offline recipient is an
    /// expected outcome, not an error — they see the payment on next fetch.
    pub fn payment_notice(&self, payload: PaymentPayload) {
        let recipient_id = payload.recipient_id.clone();
        let delivered = self
            .registry
            .send_to_user(&recipient_id, &ServerEvent::PaymentNotice(payload));
        if delivered == 0 {
            tracing::debug!(recipient = %recipient_id, "payment notice dropped, recipient offline");
        }
    }

    /// Loan discovery is public: everyone sees it, the requester included.
    pub fn loan_notice(&self, loan: Value) {
        self.broadcast.dispatch(None, ServerEvent::LoanNotice(loan));
    }

    /// Emitted by the REST apply handler after a slot was claimed.
    pub fn labour_applied(&self, payload: LabourAppliedPayload) {
        self.broadcast
            .dispatch(None, ServerEvent::LabourApplied(payload));
    }
}
