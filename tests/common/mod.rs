#![allow(dead_code)]

use async_trait::async_trait;
use paydesk::domain::ports::{ClaimSummary, MessagingGateway, OutcomeNotice};
use paydesk::domain::record::{Amount, Claim, UserId, ValidityPeriod};
use paydesk::error::{PaymentError, Result};
use std::sync::Mutex;

/// Gateway double that records every outbound notification.
#[derive(Default)]
pub struct RecordingGateway {
    pub admin: Mutex<Vec<ClaimSummary>>,
    pub submitter: Mutex<Vec<(UserId, OutcomeNotice)>>,
    pub log: Mutex<Vec<String>>,
    /// When set, submitter delivery fails (user blocked the bot).
    pub fail_submitter: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_submitter() -> Self {
        Self {
            fail_submitter: true,
            ..Self::default()
        }
    }

    pub fn submitter_notices(&self, user_id: UserId) -> Vec<OutcomeNotice> {
        self.submitter
            .lock()
            .unwrap()
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn notify_admin(&self, summary: &ClaimSummary) -> Result<()> {
        self.admin.lock().unwrap().push(summary.clone());
        Ok(())
    }

    async fn notify_submitter(&self, user_id: UserId, notice: &OutcomeNotice) -> Result<()> {
        if self.fail_submitter {
            return Err(PaymentError::InternalError(Box::new(std::io::Error::other(
                "submitter unreachable",
            ))));
        }
        self.submitter.lock().unwrap().push((user_id, notice.clone()));
        Ok(())
    }

    async fn notify_log(&self, line: &str) -> Result<()> {
        self.log.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

pub fn claim(user_id: UserId, transaction_id: &str) -> Claim {
    claim_with_period(user_id, transaction_id, 30, "days")
}

pub fn claim_with_period(
    user_id: UserId,
    transaction_id: &str,
    count: u32,
    unit: &str,
) -> Claim {
    Claim::new(
        user_id,
        format!("user{user_id}"),
        transaction_id,
        Amount::new(100).unwrap(),
        ValidityPeriod::parse(count, unit).unwrap(),
    )
    .unwrap()
}
