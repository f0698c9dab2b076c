use crate::domain::record::{RecordId, RecordStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    /// The transaction id has already been seen, in any status. Consumed ids
    /// are never freed for reuse, so this is terminal for the submission.
    #[error("transaction id `{0}` has already been used")]
    DuplicateTransaction(String),

    /// The submitter holds an unexpired approval and the configured policy
    /// refuses stacking a new claim on top of it.
    #[error("an approved record is still active; new claims are blocked")]
    ConflictingApproval,

    /// A conflict choice arrived with no stashed submission to apply it to
    /// (buffer expired or nothing was ever submitted).
    #[error("no submission is awaiting input from user {0}")]
    NoPendingSubmission(i64),

    /// The caller of a decision is not the configured administrator.
    #[error("caller {0} is not the configured administrator")]
    Unauthorized(i64),

    /// A decision referenced a record id the store has never issued.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// A status change that does not leave `pending`, or that carries expiry
    /// data for a non-approval. Store implementations refuse these instead
    /// of applying them.
    #[error("invalid status change to {0}")]
    InvalidTransition(RecordStatus),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(err))
    }
}
