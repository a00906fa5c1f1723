use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ApiError;
use crate::models::call_log::{CallLog, ScheduleStatus, ScheduledCall};
use crate::models::labour::{LabourPost, LabourStatus};
use crate::models::message::CommunityMessage;
use crate::models::post::CommunityPost;

/// Abstraction over durable community storage.
///
/// Backed by MongoDB in production and an in-memory store in tests. The hub
/// never treats it as the source of truth for the guarded counters — the
/// in-memory boards mutate first, then the durable copy is refreshed.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn insert_post(&self, post: CommunityPost) -> Result<(), ApiError>;
    async fn list_posts(&self) -> Result<Vec<CommunityPost>, ApiError>;
    async fn record_vote(
        &self,
        post_id: &str,
        voter_id: &str,
        choice: i32,
        total: i64,
    ) -> Result<(), ApiError>;

    async fn insert_labour_post(&self, post: LabourPost) -> Result<(), ApiError>;
    async fn list_labour_posts(&self) -> Result<Vec<LabourPost>, ApiError>;
    async fn get_labour_post(&self, post_id: &str) -> Result<Option<LabourPost>, ApiError>;
    async fn record_application(
        &self,
        post_id: &str,
        applicant_id: &str,
        remaining: u32,
        filled: bool,
    ) -> Result<(), ApiError>;

    async fn insert_message(&self, message: CommunityMessage) -> Result<(), ApiError>;
    /// Most recent chat messages, newest first, capped at 100.
    async fn list_messages(&self) -> Result<Vec<CommunityMessage>, ApiError>;

    async fn insert_call_log(&self, log: CallLog) -> Result<(), ApiError>;
    async fn list_call_logs(&self, user_id: &str) -> Result<Vec<CallLog>, ApiError>;

    async fn insert_scheduled_call(&self, call: ScheduledCall) -> Result<(), ApiError>;
    async fn list_scheduled_calls(&self, user_id: &str) -> Result<Vec<ScheduledCall>, ApiError>;
    /// Marks a scheduled call cancelled. Returns false if no such call exists.
    async fn cancel_scheduled_call(&self, id: &str) -> Result<bool, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (dev / tests)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    posts: Mutex<Vec<CommunityPost>>,
    votes: Mutex<HashMap<String, HashMap<String, i32>>>,
    labour_posts: Mutex<Vec<LabourPost>>,
    messages: Mutex<Vec<CommunityMessage>>,
    call_logs: Mutex<Vec<CallLog>>,
    scheduled_calls: Mutex<Vec<ScheduledCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn insert_post(&self, post: CommunityPost) -> Result<(), ApiError> {
        self.posts.lock().unwrap().push(post);
        Ok(())
    }

    async fn list_posts(&self) -> Result<Vec<CommunityPost>, ApiError> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn record_vote(
        &self,
        post_id: &str,
        voter_id: &str,
        choice: i32,
        total: i64,
    ) -> Result<(), ApiError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        post.votes = total;

        let mut votes = self.votes.lock().unwrap();
        let choices = votes.entry(post_id.to_string()).or_default();
        if choice == 0 {
            choices.remove(voter_id);
        } else {
            choices.insert(voter_id.to_string(), choice);
        }
        Ok(())
    }

    async fn insert_labour_post(&self, post: LabourPost) -> Result<(), ApiError> {
        self.labour_posts.lock().unwrap().push(post);
        Ok(())
    }

    async fn list_labour_posts(&self) -> Result<Vec<LabourPost>, ApiError> {
        let mut posts = self.labour_posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn get_labour_post(&self, post_id: &str) -> Result<Option<LabourPost>, ApiError> {
        Ok(self
            .labour_posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == post_id)
            .cloned())
    }

    async fn record_application(
        &self,
        post_id: &str,
        _applicant_id: &str,
        remaining: u32,
        filled: bool,
    ) -> Result<(), ApiError> {
        let mut posts = self.labour_posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| ApiError::not_found("Job post not found"))?;
        post.labour_count = remaining;
        if filled {
            post.status = LabourStatus::Filled;
        }
        Ok(())
    }

    async fn insert_message(&self, message: CommunityMessage) -> Result<(), ApiError> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<CommunityMessage>, ApiError> {
        let mut messages = self.messages.lock().unwrap().clone();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(100);
        Ok(messages)
    }

    async fn insert_call_log(&self, log: CallLog) -> Result<(), ApiError> {
        self.call_logs.lock().unwrap().push(log);
        Ok(())
    }

    async fn list_call_logs(&self, user_id: &str) -> Result<Vec<CallLog>, ApiError> {
        let mut logs: Vec<CallLog> = self
            .call_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.caller_id.as_deref() == Some(user_id)
                    || l.receiver_id.as_deref() == Some(user_id)
            })
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }

    async fn insert_scheduled_call(&self, call: ScheduledCall) -> Result<(), ApiError> {
        self.scheduled_calls.lock().unwrap().push(call);
        Ok(())
    }

    async fn list_scheduled_calls(&self, user_id: &str) -> Result<Vec<ScheduledCall>, ApiError> {
        let now = Utc::now();
        let mut calls: Vec<ScheduledCall> = self
            .scheduled_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| {
                c.status == ScheduleStatus::Scheduled
                    && c.scheduled_time >= now
                    && (c.scheduler_id.as_deref() == Some(user_id)
                        || c.target_id.as_deref() == Some(user_id))
            })
            .cloned()
            .collect();
        calls.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        Ok(calls)
    }

    async fn cancel_scheduled_call(&self, id: &str) -> Result<bool, ApiError> {
        let mut calls = self.scheduled_calls.lock().unwrap();
        match calls.iter_mut().find(|c| c.id == id) {
            Some(call) => {
                call.status = ScheduleStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
