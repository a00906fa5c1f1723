//! Per-post vote tallies with one idempotent choice per voter.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Result of a vote update: the post's new total and the voter's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub total: i64,
    pub choice: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VoteError {
    UnknownPost,
    InvalidChoice(i32),
}

#[derive(Default)]
struct VoteRecord {
    total: i64,
    choices: HashMap<String, i32>,
}

/// Vote board for all community posts.
///
/// Invariant: a record's `total` always equals the sum of its non-zero
/// `choices` entries. Holding the entry lock across the read-compute-write
/// is what keeps concurrent votes on the same post from losing updates.
pub struct VoteBoard {
    posts: DashMap<String, Mutex<VoteRecord>>,
}

impl VoteBoard {
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
        }
    }

    /// Start tracking votes for a newly created post.
    pub fn open(&self, post_id: &str) {
        self.posts.entry(post_id.to_string()).or_default();
    }

    /// Apply a voter's new choice: +1 up, -1 down, 0 removes their vote.
    /// Re-voting replaces the previous contribution, never double-counts.
    pub fn update(
        &self,
        post_id: &str,
        voter_id: &str,
        choice: i32,
    ) -> Result<VoteOutcome, VoteError> {
        if !matches!(choice, -1 | 0 | 1) {
            return Err(VoteError::InvalidChoice(choice));
        }
        let entry = self.posts.get(post_id).ok_or(VoteError::UnknownPost)?;
        let mut record = entry.lock();

        let previous = record.choices.get(voter_id).copied().unwrap_or(0);
        let delta = i64::from(choice - previous);
        record.total += delta;
        if choice == 0 {
            record.choices.remove(voter_id);
        } else {
            record.choices.insert(voter_id.to_string(), choice);
        }

        Ok(VoteOutcome {
            total: record.total,
            choice,
        })
    }

    /// Current total for a post, if tracked.
    pub fn total(&self, post_id: &str) -> Option<i64> {
        self.posts.get(post_id).map(|entry| entry.lock().total)
    }
}
