use super::decision::{DecisionEngine, DecisionOutcome};
use super::intake::{
    AttachmentOutcome, CancelOutcome, ConflictChoice, IntakeController, SubmitOutcome,
};
use super::session::SessionCache;
use crate::config::ServiceConfig;
use crate::domain::ports::{MessagingGatewayArc, RecordStoreArc};
use crate::domain::record::{Amount, Claim, DecisionAction, RecordId, UserId, ValidityPeriod};
use crate::error::Result;
use std::sync::Arc;

/// One unit of work from the messaging gateway, with the text extractor
/// already applied: submissions arrive as structured fields, not free text.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Submission {
        user_id: UserId,
        username: String,
        transaction_id: String,
        amount: u64,
        period_count: u32,
        period_unit: String,
    },
    Choice {
        user_id: UserId,
        choice: ConflictChoice,
    },
    Cancel {
        user_id: UserId,
    },
    Attachment {
        user_id: UserId,
        image_ref: String,
        reply_to: Option<RecordId>,
    },
    AdminAction {
        actor: UserId,
        record_id: RecordId,
        action: DecisionAction,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Submission(SubmitOutcome),
    Cancellation(CancelOutcome),
    Attachment(AttachmentOutcome),
    Decision(DecisionOutcome),
}

/// Routes inbound events to the intake controller or decision engine. Both
/// components share the record store as the single source of truth and never
/// talk to each other.
#[derive(Clone)]
pub struct PaymentService {
    intake: IntakeController,
    decision: DecisionEngine,
}

impl PaymentService {
    pub fn new(
        config: &ServiceConfig,
        store: RecordStoreArc,
        gateway: MessagingGatewayArc,
    ) -> Self {
        let sessions = Arc::new(SessionCache::new(config.session_ttl));
        Self {
            intake: IntakeController::new(config, store.clone(), gateway.clone(), sessions),
            decision: DecisionEngine::new(config, store, gateway),
        }
    }

    pub fn intake(&self) -> &IntakeController {
        &self.intake
    }

    pub fn decision(&self) -> &DecisionEngine {
        &self.decision
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<EventOutcome> {
        match event {
            InboundEvent::Submission {
                user_id,
                username,
                transaction_id,
                amount,
                period_count,
                period_unit,
            } => {
                let claim = Claim::new(
                    user_id,
                    username,
                    transaction_id,
                    Amount::new(amount)?,
                    ValidityPeriod::parse(period_count, &period_unit)?,
                )?;
                Ok(EventOutcome::Submission(self.intake.submit(claim).await?))
            }
            InboundEvent::Choice { user_id, choice } => Ok(EventOutcome::Submission(
                self.intake.resolve_conflict(user_id, choice).await?,
            )),
            InboundEvent::Cancel { user_id } => {
                Ok(EventOutcome::Cancellation(self.intake.cancel(user_id).await?))
            }
            InboundEvent::Attachment {
                user_id,
                image_ref,
                reply_to,
            } => Ok(EventOutcome::Attachment(
                self.intake.attach(user_id, &image_ref, reply_to).await?,
            )),
            InboundEvent::AdminAction {
                actor,
                record_id,
                action,
            } => Ok(EventOutcome::Decision(
                self.decision.decide(record_id, action, actor).await?,
            )),
        }
    }
}
