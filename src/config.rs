use crate::domain::record::UserId;
use std::time::Duration;

/// What to do when a submitter with an unexpired approval submits again.
///
/// The blocking policy varied across deployments of the original system, so
/// it is configuration, not a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovedConflictPolicy {
    /// Offer an explicit continue/abort choice (the representative contract).
    #[default]
    Warn,
    /// Stack freely; renewals need no confirmation.
    Allow,
    /// Refuse outright while an approval is active.
    Block,
}

/// Explicitly constructed service context. Built once in `main` and handed
/// to both components; there are no globals.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// The only identity allowed to approve or reject.
    pub admin_id: UserId,
    /// How long a stashed claim waits for a conflict choice or screenshot.
    pub session_ttl: Duration,
    pub approved_conflict: ApprovedConflictPolicy,
}

impl ServiceConfig {
    pub fn new(admin_id: UserId) -> Self {
        Self {
            admin_id,
            session_ttl: Duration::from_secs(10 * 60),
            approved_conflict: ApprovedConflictPolicy::default(),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_approved_conflict(mut self, policy: ApprovedConflictPolicy) -> Self {
        self.approved_conflict = policy;
        self
    }
}
