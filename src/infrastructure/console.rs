use crate::domain::ports::{ClaimSummary, MessagingGateway, OutcomeNotice};
use crate::domain::record::UserId;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Gateway that renders notifications as tracing events instead of chat
/// messages. Stands in for the chat platform client in the replay binary.
#[derive(Default, Clone)]
pub struct ConsoleGateway;

impl ConsoleGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    async fn notify_admin(&self, summary: &ClaimSummary) -> Result<()> {
        info!(
            record_id = %summary.record_id,
            user_id = summary.user_id,
            username = %summary.username,
            transaction_id = %summary.transaction_id,
            amount = %summary.amount,
            validity = %summary.validity,
            "admin: new claim awaiting approve/reject"
        );
        Ok(())
    }

    async fn notify_submitter(&self, user_id: UserId, notice: &OutcomeNotice) -> Result<()> {
        match notice {
            OutcomeNotice::Approved {
                transaction_id,
                amount,
                validity,
                expiry_at,
            } => info!(
                user_id,
                %transaction_id,
                %amount,
                %validity,
                expiry_at = %expiry_at.format("%Y-%m-%d %H:%M:%S UTC"),
                "submitter: payment approved"
            ),
            OutcomeNotice::Rejected { transaction_id } => {
                info!(user_id, %transaction_id, "submitter: payment rejected")
            }
            OutcomeNotice::Cancelled { transaction_id } => {
                info!(user_id, %transaction_id, "submitter: claim cancelled")
            }
        }
        Ok(())
    }

    async fn notify_log(&self, line: &str) -> Result<()> {
        info!(target: "paydesk::audit", "{line}");
        Ok(())
    }
}
