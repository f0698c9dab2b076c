use super::record::{
    Amount, Claim, PaymentRecord, RecordId, RecordStatus, StatusChange, UserId, ValidityPeriod,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared handles: both application components are cloned across concurrent
/// event-handling tasks, so the ports travel as `Arc` trait objects.
pub type RecordStoreArc = Arc<dyn RecordStore>;
pub type MessagingGatewayArc = Arc<dyn MessagingGateway>;

/// Result of the compare-and-set transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The record was still pending and the change was applied.
    Applied(PaymentRecord),
    /// The record had already left pending; carries the status that won.
    AlreadyDecided(RecordStatus),
    /// No record with that id exists.
    NotFound,
}

/// Durable storage for payment records. The single source of truth; all
/// status mutation after creation goes through [`RecordStore::transition`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a new pending record, assigning its id. Fails with
    /// `DuplicateTransaction` if the transaction id was ever seen before,
    /// regardless of that record's status.
    async fn insert(&self, claim: Claim, created_at: DateTime<Utc>) -> Result<PaymentRecord>;

    async fn get(&self, id: RecordId) -> Result<Option<PaymentRecord>>;

    async fn find_by_transaction_id(&self, transaction_id: &str)
    -> Result<Option<PaymentRecord>>;

    async fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: RecordStatus,
    ) -> Result<Vec<PaymentRecord>>;

    /// Applies `change` only if the record's current status is still
    /// `Pending`. This is the sole ordering primitive for a record: of any
    /// number of concurrent callers, at most one observes `Applied`.
    async fn transition(&self, id: RecordId, change: StatusChange) -> Result<TransitionOutcome>;

    /// Stores the opaque screenshot handle on an existing record. Returns
    /// false if the record does not exist. Does not touch lifecycle fields.
    async fn attach_screenshot(&self, id: RecordId, image_ref: &str) -> Result<bool>;

    /// Every record in the store, for reporting. Ordered by id.
    async fn all_records(&self) -> Result<Vec<PaymentRecord>>;
}

/// What the admin channel needs to render a new claim with its two actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSummary {
    pub record_id: RecordId,
    pub user_id: UserId,
    pub username: String,
    pub transaction_id: String,
    pub amount: Amount,
    pub validity: ValidityPeriod,
}

impl ClaimSummary {
    pub fn from_record(record: &PaymentRecord) -> Self {
        Self {
            record_id: record.id,
            user_id: record.user_id,
            username: record.username.clone(),
            transaction_id: record.transaction_id.clone(),
            amount: record.amount,
            validity: record.validity,
        }
    }
}

/// Typed outcome notifications to the submitter. Rendering is the gateway's
/// problem; the core only states what happened.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeNotice {
    Approved {
        transaction_id: String,
        amount: Amount,
        validity: ValidityPeriod,
        expiry_at: DateTime<Utc>,
    },
    Rejected {
        transaction_id: String,
    },
    Cancelled {
        transaction_id: String,
    },
}

/// The chat-platform client, seen from the core. All methods may fail;
/// callers decide per call site whether a failure is fatal or swallowed.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// New claim for review, with approve/reject actions bound to the id.
    async fn notify_admin(&self, summary: &ClaimSummary) -> Result<()>;

    /// Resolution (or cancellation) relayed back to the submitter.
    async fn notify_submitter(&self, user_id: UserId, notice: &OutcomeNotice) -> Result<()>;

    /// Best-effort audit line to the log channel.
    async fn notify_log(&self, line: &str) -> Result<()>;
}
