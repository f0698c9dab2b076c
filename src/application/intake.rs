use super::log_best_effort;
use super::session::{Conflict, SessionCache, SessionState};
use crate::config::{ApprovedConflictPolicy, ServiceConfig};
use crate::domain::ports::{
    ClaimSummary, MessagingGatewayArc, OutcomeNotice, RecordStoreArc, TransitionOutcome,
};
use crate::domain::record::{
    Claim, PaymentRecord, RecordId, RecordStatus, StatusChange, UserId,
};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A pending record was created and the admin notified.
    Created { record: PaymentRecord },
    /// The submitter already has a pending record; the claim is stashed
    /// until they answer replace/keep.
    PendingConflict { existing: RecordId },
    /// The submitter holds an unexpired approval; the claim is stashed
    /// until they answer continue/abort.
    ApprovedWarning { existing: RecordId },
    /// The submitter chose to abandon the stashed claim.
    Discarded,
}

/// Answer to a stashed conflict question. `Proceed` means "replace" against
/// a pending conflict and "continue" against an approved warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Proceed,
    Abort,
}

impl FromStr for ConflictChoice {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" | "proceed" | "continue" => Ok(ConflictChoice::Proceed),
            "keep" | "abort" => Ok(ConflictChoice::Abort),
            _ => Err(PaymentError::ValidationError(format!(
                "unknown conflict choice `{s}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled { record: PaymentRecord },
    NothingPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentOutcome {
    /// The screenshot was stored against the correlated record.
    Linked { record_id: RecordId },
    /// No in-flight claim could be associated; the image was surfaced to
    /// the log channel as uncorrelated evidence only.
    Uncorrelated,
}

/// Turns validated claims into pending records, guarding transaction-id
/// uniqueness and the submitter's own pending/approved history.
#[derive(Clone)]
pub struct IntakeController {
    store: RecordStoreArc,
    gateway: MessagingGatewayArc,
    sessions: Arc<SessionCache>,
    approved_conflict: ApprovedConflictPolicy,
}

impl IntakeController {
    pub fn new(
        config: &ServiceConfig,
        store: RecordStoreArc,
        gateway: MessagingGatewayArc,
        sessions: Arc<SessionCache>,
    ) -> Self {
        Self {
            store,
            gateway,
            sessions,
            approved_conflict: config.approved_conflict,
        }
    }

    /// Validates a claim against the store and either creates a pending
    /// record or reports why it cannot be created yet.
    pub async fn submit(&self, claim: Claim) -> Result<SubmitOutcome> {
        // A transaction id is consumed forever on first sight, whatever
        // became of the record that carried it.
        if let Some(existing) = self
            .store
            .find_by_transaction_id(&claim.transaction_id)
            .await?
        {
            info!(
                transaction_id = %claim.transaction_id,
                existing = %existing.id,
                "duplicate transaction id refused"
            );
            return Err(PaymentError::DuplicateTransaction(claim.transaction_id));
        }

        let pending = self
            .store
            .find_by_user_and_status(claim.user_id, RecordStatus::Pending)
            .await?;
        if let Some(existing) = pending.first() {
            let existing = existing.id;
            let user_id = claim.user_id;
            self.sessions
                .put(
                    user_id,
                    SessionState::AwaitingChoice {
                        claim,
                        conflict: Conflict::PendingClaim { existing },
                    },
                )
                .await;
            return Ok(SubmitOutcome::PendingConflict { existing });
        }

        if self.approved_conflict != ApprovedConflictPolicy::Allow {
            let now = Utc::now();
            let approved = self
                .store
                .find_by_user_and_status(claim.user_id, RecordStatus::Approved)
                .await?;
            if let Some(active) = approved.iter().find(|r| r.is_active_approval(now)) {
                if self.approved_conflict == ApprovedConflictPolicy::Block {
                    return Err(PaymentError::ConflictingApproval);
                }
                let existing = active.id;
                let user_id = claim.user_id;
                self.sessions
                    .put(
                        user_id,
                        SessionState::AwaitingChoice {
                            claim,
                            conflict: Conflict::ActiveApproval { existing },
                        },
                    )
                    .await;
                return Ok(SubmitOutcome::ApprovedWarning { existing });
            }
        }

        self.create(claim).await
    }

    /// Answers the replace/keep (or continue/abort) question for the
    /// submitter's stashed claim.
    pub async fn resolve_conflict(
        &self,
        user_id: UserId,
        choice: ConflictChoice,
    ) -> Result<SubmitOutcome> {
        let state = self
            .sessions
            .take(user_id)
            .await
            .ok_or(PaymentError::NoPendingSubmission(user_id))?;
        let (claim, conflict) = match state {
            SessionState::AwaitingChoice { claim, conflict } => (claim, conflict),
            other => {
                // An awaiting-screenshot entry has no open question; keep it.
                self.sessions.put(user_id, other).await;
                return Err(PaymentError::NoPendingSubmission(user_id));
            }
        };

        if choice == ConflictChoice::Abort {
            return Ok(SubmitOutcome::Discarded);
        }

        if let Conflict::PendingClaim { existing } = conflict {
            match self
                .store
                .transition(existing, StatusChange::cancel(user_id, Utc::now()))
                .await?
            {
                TransitionOutcome::Applied(old) => {
                    log_best_effort(
                        self.gateway.as_ref(),
                        &format!(
                            "record {} (tx {}) cancelled, replaced by a new claim",
                            old.id, old.transaction_id
                        ),
                    )
                    .await;
                }
                TransitionOutcome::AlreadyDecided(status) => {
                    // The admin resolved the old record while the user was
                    // deliberating. Nothing to replace; just create.
                    info!(record_id = %existing, %status, "replace target already decided");
                }
                TransitionOutcome::NotFound => {
                    warn!(record_id = %existing, "replace target vanished");
                }
            }
        }

        self.create(claim).await
    }

    /// Submitter-initiated cancellation of their own pending record.
    pub async fn cancel(&self, user_id: UserId) -> Result<CancelOutcome> {
        let pending = self
            .store
            .find_by_user_and_status(user_id, RecordStatus::Pending)
            .await?;
        let Some(record) = pending.first() else {
            return Ok(CancelOutcome::NothingPending);
        };

        match self
            .store
            .transition(record.id, StatusChange::cancel(user_id, Utc::now()))
            .await?
        {
            TransitionOutcome::Applied(record) => {
                self.sessions.clear(user_id).await;
                let notice = OutcomeNotice::Cancelled {
                    transaction_id: record.transaction_id.clone(),
                };
                if let Err(err) = self.gateway.notify_submitter(user_id, &notice).await {
                    warn!(record_id = %record.id, error = %err, "submitter notification failed");
                }
                log_best_effort(
                    self.gateway.as_ref(),
                    &format!("record {} cancelled by submitter {user_id}", record.id),
                )
                .await;
                Ok(CancelOutcome::Cancelled { record })
            }
            // Lost the race against an admin decision; the decision stands.
            TransitionOutcome::AlreadyDecided(_) | TransitionOutcome::NotFound => {
                Ok(CancelOutcome::NothingPending)
            }
        }
    }

    /// Correlates an incoming screenshot with the submitter's in-flight
    /// claim, either through an explicit reply reference or the session
    /// buffer. An image that cannot be correlated is never guessed onto a
    /// record.
    pub async fn attach(
        &self,
        user_id: UserId,
        image_ref: &str,
        reply_to: Option<RecordId>,
    ) -> Result<AttachmentOutcome> {
        let target = match reply_to {
            Some(id) => Some(id),
            None => self.sessions.take_screenshot_target(user_id).await,
        };

        if let Some(record_id) = target
            && self.store.attach_screenshot(record_id, image_ref).await?
        {
            log_best_effort(
                self.gateway.as_ref(),
                &format!("screenshot {image_ref} attached to record {record_id} by user {user_id}"),
            )
            .await;
            return Ok(AttachmentOutcome::Linked { record_id });
        }

        log_best_effort(
            self.gateway.as_ref(),
            &format!("uncorrelated screenshot {image_ref} from user {user_id}"),
        )
        .await;
        Ok(AttachmentOutcome::Uncorrelated)
    }

    async fn create(&self, claim: Claim) -> Result<SubmitOutcome> {
        // The store re-checks transaction-id uniqueness on insert, closing
        // the window between the submit-time check and this write.
        let record = self.store.insert(claim, Utc::now()).await?;
        self.sessions
            .put(
                record.user_id,
                SessionState::AwaitingScreenshot {
                    record_id: record.id,
                },
            )
            .await;

        let summary = ClaimSummary::from_record(&record);
        if let Err(err) = self.gateway.notify_admin(&summary).await {
            // The record exists either way; the store is the source of truth.
            warn!(record_id = %record.id, error = %err, "admin notification failed");
        }
        info!(
            record_id = %record.id,
            user_id = record.user_id,
            transaction_id = %record.transaction_id,
            "payment record created"
        );
        Ok(SubmitOutcome::Created { record })
    }
}
