use crate::domain::record::{Claim, RecordId, UserId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Why a submission could not be created immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The submitter already has a pending record; replace or keep.
    PendingClaim { existing: RecordId },
    /// The submitter holds an unexpired approval; continue or abort.
    ActiveApproval { existing: RecordId },
}

/// What a submitter's session is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// A claim stashed behind an unanswered replace/keep (or continue/abort)
    /// question.
    AwaitingChoice { claim: Claim, conflict: Conflict },
    /// A created record that may still receive its screenshot.
    AwaitingScreenshot { record_id: RecordId },
}

/// Time-boxed per-submitter buffer correlating follow-up events (conflict
/// choices, screenshots) with an in-flight submission.
///
/// Purely advisory in-memory state: entries expire after the TTL and are
/// dropped lazily on access. Losing one only forces a resubmission.
pub struct SessionCache {
    ttl: Duration,
    entries: RwLock<HashMap<UserId, Entry>>,
}

struct Entry {
    state: SessionState,
    stored_at: Instant,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn put(&self, user_id: UserId, state: SessionState) {
        let mut entries = self.entries.write().await;
        entries.insert(
            user_id,
            Entry {
                state,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes and returns the submitter's session state, if still fresh.
    pub async fn take(&self, user_id: UserId) -> Option<SessionState> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(&user_id)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.state)
    }

    /// Consumes an `AwaitingScreenshot` entry and returns its record id.
    /// An `AwaitingChoice` entry is left in place: no record exists yet, so
    /// a screenshot cannot be correlated to it.
    pub async fn take_screenshot_target(&self, user_id: UserId) -> Option<RecordId> {
        let mut entries = self.entries.write().await;
        let target = match entries.get(&user_id) {
            None => return None,
            Some(entry) if entry.stored_at.elapsed() > self.ttl => None,
            Some(Entry {
                state: SessionState::AwaitingScreenshot { record_id },
                ..
            }) => Some(*record_id),
            // A stashed choice stays put; no record exists for it yet.
            Some(_) => return None,
        };
        entries.remove(&user_id);
        target
    }

    pub async fn clear(&self, user_id: UserId) {
        self.entries.write().await.remove(&user_id);
    }
}
