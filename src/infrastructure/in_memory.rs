use crate::domain::ports::{RecordStore, TransitionOutcome};
use crate::domain::record::{
    Claim, PaymentRecord, RecordId, RecordStatus, StatusChange, UserId,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory record store.
///
/// All state sits behind one `tokio::sync::RwLock`, which is what makes the
/// transition a genuine compare-and-set: the status check and the write
/// happen under the same write guard. `Clone` shares the underlying map.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, PaymentRecord>,
    // transaction_id -> record id; entries are never removed, which is what
    // makes a consumed transaction id permanent.
    tx_index: HashMap<String, RecordId>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, claim: Claim, created_at: DateTime<Utc>) -> Result<PaymentRecord> {
        let mut inner = self.inner.write().await;
        if inner.tx_index.contains_key(&claim.transaction_id) {
            return Err(PaymentError::DuplicateTransaction(claim.transaction_id));
        }

        inner.next_id += 1;
        let id = RecordId(inner.next_id);
        let record = PaymentRecord::new(id, claim, created_at);
        inner.tx_index.insert(record.transaction_id.clone(), id);
        inner.records.insert(id.0, record.clone());
        Ok(record)
    }

    async fn get(&self, id: RecordId) -> Result<Option<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(&id.0).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tx_index
            .get(transaction_id)
            .and_then(|id| inner.records.get(&id.0))
            .cloned())
    }

    async fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: RecordStatus,
    ) -> Result<Vec<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.status == status)
            .cloned()
            .collect())
    }

    async fn transition(&self, id: RecordId, change: StatusChange) -> Result<TransitionOutcome> {
        change.validate()?;
        let mut inner = self.inner.write().await;
        let Some(record) = inner.records.get_mut(&id.0) else {
            return Ok(TransitionOutcome::NotFound);
        };
        if record.status != RecordStatus::Pending {
            return Ok(TransitionOutcome::AlreadyDecided(record.status));
        }
        record.apply(&change);
        Ok(TransitionOutcome::Applied(record.clone()))
    }

    async fn attach_screenshot(&self, id: RecordId, image_ref: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(&id.0) {
            Some(record) => {
                record.screenshot_ref = Some(image_ref.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn all_records(&self) -> Result<Vec<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.values().cloned().collect())
    }
}
