//! Labour-slot counters: decrement-with-floor, exactly once per applicant.

use std::collections::HashSet;

use dashmap::DashMap;
use parking_lot::Mutex;

/// Result of a successful application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub remaining: u32,
    pub filled: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ApplyError {
    UnknownPost,
    AlreadyApplied,
    JobFilled,
}

#[derive(Default)]
struct SlotRecord {
    remaining: u32,
    applicants: HashSet<String>,
    filled: bool,
}

/// Slot board for all labour posts.
///
/// Invariant: `remaining` decreases by exactly one per distinct successful
/// applicant and never goes below zero; a repeat applicant is rejected before
/// any slot accounting happens.
pub struct LabourBoard {
    posts: DashMap<String, Mutex<SlotRecord>>,
}

impl LabourBoard {
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
        }
    }

    /// Start tracking a labour post with the given number of open slots.
    pub fn open(&self, post_id: &str, slots: u32) {
        self.posts.insert(
            post_id.to_string(),
            Mutex::new(SlotRecord {
                remaining: slots,
                applicants: HashSet::new(),
                filled: slots == 0,
            }),
        );
    }

    /// Claim one slot for `applicant_id`.
    pub fn apply(&self, post_id: &str, applicant_id: &str) -> Result<ApplyOutcome, ApplyError> {
        let entry = self.posts.get(post_id).ok_or(ApplyError::UnknownPost)?;
        let mut record = entry.lock();

        if record.applicants.contains(applicant_id) {
            return Err(ApplyError::AlreadyApplied);
        }
        if record.filled || record.remaining == 0 {
            return Err(ApplyError::JobFilled);
        }

        record.remaining -= 1;
        record.applicants.insert(applicant_id.to_string());
        if record.remaining == 0 {
            record.filled = true;
        }

        Ok(ApplyOutcome {
            remaining: record.remaining,
            filled: record.filled,
        })
    }

    /// Current `(remaining, filled)` for a post, if tracked.
    pub fn remaining(&self, post_id: &str) -> Option<(u32, bool)> {
        self.posts.get(post_id).map(|entry| {
            let record = entry.lock();
            (record.remaining, record.filled)
        })
    }
}
