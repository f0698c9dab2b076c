use crate::domain::ports::{RecordStore, TransitionOutcome};
use crate::domain::record::{
    Claim, PaymentRecord, RecordId, RecordStatus, StatusChange, UserId,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment records, keyed by record id (big-endian u64,
/// so iteration order is id order).
pub const CF_RECORDS: &str = "records";
/// Column Family mapping transaction id -> record id. Entries are never
/// deleted; a consumed transaction id stays consumed.
pub const CF_TX_INDEX: &str = "tx_index";
/// Column Family for store metadata (the id sequence).
pub const CF_META: &str = "meta";

const NEXT_ID_KEY: &[u8] = b"next_id";

/// A persistent record store backed by RocksDB.
///
/// Values are JSON documents. All read-modify-write paths (insert,
/// transition, screenshot attach) serialize behind one async mutex, which is
/// what upholds the compare-and-set guarantee for this backend. `Clone`
/// shares the underlying `Arc<DB>` and the lock.
#[derive(Clone)]
pub struct RocksDBRecordStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBRecordStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_RECORDS, Options::default()),
            ColumnFamilyDescriptor::new(CF_TX_INDEX, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "column family {name} not found"
            ))))
        })
    }

    fn read_record(&self, id: RecordId) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(CF_RECORDS)?;
        match self.db.get_cf(&cf, id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_record(&self, record: &PaymentRecord) -> Result<()> {
        let cf = self.cf(CF_RECORDS)?;
        let value = serde_json::to_vec(record)?;
        self.db.put_cf(&cf, record.id.0.to_be_bytes(), value)?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        let cf = self.cf(CF_META)?;
        let current = match self.db.get_cf(&cf, NEXT_ID_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    PaymentError::InternalError(Box::new(std::io::Error::other(
                        "corrupt id sequence",
                    )))
                })?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        Ok(current + 1)
    }
}

#[async_trait]
impl RecordStore for RocksDBRecordStore {
    async fn insert(&self, claim: Claim, created_at: DateTime<Utc>) -> Result<PaymentRecord> {
        let _guard = self.write_lock.lock().await;

        let tx_cf = self.cf(CF_TX_INDEX)?;
        if self
            .db
            .get_pinned_cf(&tx_cf, claim.transaction_id.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::DuplicateTransaction(claim.transaction_id));
        }

        let id = RecordId(self.next_id()?);
        let record = PaymentRecord::new(id, claim, created_at);

        // One batch so a crash cannot leave the index, sequence and record
        // out of step.
        let mut batch = WriteBatch::default();
        let records_cf = self.cf(CF_RECORDS)?;
        let meta_cf = self.cf(CF_META)?;
        batch.put_cf(&records_cf, id.0.to_be_bytes(), serde_json::to_vec(&record)?);
        batch.put_cf(
            &tx_cf,
            record.transaction_id.as_bytes(),
            id.0.to_be_bytes(),
        );
        batch.put_cf(&meta_cf, NEXT_ID_KEY, id.0.to_be_bytes());
        self.db.write(batch)?;

        Ok(record)
    }

    async fn get(&self, id: RecordId) -> Result<Option<PaymentRecord>> {
        self.read_record(id)
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        let tx_cf = self.cf(CF_TX_INDEX)?;
        let Some(bytes) = self.db.get_cf(&tx_cf, transaction_id.as_bytes())? else {
            return Ok(None);
        };
        let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            PaymentError::InternalError(Box::new(std::io::Error::other("corrupt index entry")))
        })?;
        self.read_record(RecordId(u64::from_be_bytes(arr)))
    }

    async fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: RecordStatus,
    ) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .all_records()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id && r.status == status)
            .collect())
    }

    async fn transition(&self, id: RecordId, change: StatusChange) -> Result<TransitionOutcome> {
        change.validate()?;
        let _guard = self.write_lock.lock().await;

        let Some(mut record) = self.read_record(id)? else {
            return Ok(TransitionOutcome::NotFound);
        };
        if record.status != RecordStatus::Pending {
            return Ok(TransitionOutcome::AlreadyDecided(record.status));
        }
        record.apply(&change);
        self.write_record(&record)?;
        Ok(TransitionOutcome::Applied(record))
    }

    async fn attach_screenshot(&self, id: RecordId, image_ref: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let Some(mut record) = self.read_record(id)? else {
            return Ok(false);
        };
        record.screenshot_ref = Some(image_ref.to_string());
        self.write_record(&record)?;
        Ok(true)
    }

    async fn all_records(&self) -> Result<Vec<PaymentRecord>> {
        let cf = self.cf(CF_RECORDS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}
