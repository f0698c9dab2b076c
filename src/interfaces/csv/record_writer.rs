use crate::domain::record::PaymentRecord;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::io::Write;

fn format_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Writes the final record table as CSV.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_records(&mut self, records: Vec<PaymentRecord>) -> Result<()> {
        self.writer.write_record([
            "record_id",
            "user_id",
            "username",
            "transaction_id",
            "amount",
            "period",
            "status",
            "decided_by",
            "expiry_at",
        ])?;
        for record in records {
            self.writer.write_record([
                record.id.to_string(),
                record.user_id.to_string(),
                record.username.clone(),
                record.transaction_id.clone(),
                record.amount.to_string(),
                record.validity.to_string(),
                record.status.to_string(),
                record.decided_by.map(|u| u.to_string()).unwrap_or_default(),
                format_ts(record.expiry_at),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{
        Amount, Claim, RecordId, StatusChange, ValidityPeriod,
    };

    #[test]
    fn test_writes_pending_and_decided_rows() {
        let claim = Claim::new(
            1,
            "alice",
            "TX1",
            Amount::new(100).unwrap(),
            ValidityPeriod::parse(30, "days").unwrap(),
        )
        .unwrap();
        let now = Utc::now();
        let mut approved = PaymentRecord::new(RecordId(1), claim.clone(), now);
        approved.apply(&StatusChange::approve(9, now, approved.validity));
        let pending = PaymentRecord::new(
            RecordId(2),
            Claim::new(2, "bob", "TX2", claim.amount, claim.validity).unwrap(),
            now,
        );

        let mut out = Vec::new();
        RecordWriter::new(&mut out)
            .write_records(vec![approved, pending])
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "record_id,user_id,username,transaction_id,amount,period,status,decided_by,expiry_at"
        );
        let approved_line = lines.next().unwrap();
        assert!(approved_line.starts_with("00000001,1,alice,TX1,100,30 days,approved,9,"));
        let pending_line = lines.next().unwrap();
        assert_eq!(pending_line, "00000002,2,bob,TX2,100,30 days,pending,,");
    }
}
