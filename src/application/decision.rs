use super::log_best_effort;
use crate::config::ServiceConfig;
use crate::domain::ports::{
    MessagingGatewayArc, OutcomeNotice, RecordStoreArc, TransitionOutcome,
};
use crate::domain::record::{DecisionAction, PaymentRecord, RecordId, RecordStatus, StatusChange, UserId};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use tracing::{info, warn};

/// Result of an admin decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// This caller won the transition; the record now carries the decision.
    Decided { record: PaymentRecord },
    /// Another decision got there first. Expected under double-taps and
    /// concurrent admin replicas; nothing changed and nobody was notified.
    AlreadyDecided { status: RecordStatus },
}

/// Resolves pending records to approved or rejected, exactly once each.
#[derive(Clone)]
pub struct DecisionEngine {
    store: RecordStoreArc,
    gateway: MessagingGatewayArc,
    admin_id: UserId,
}

impl DecisionEngine {
    pub fn new(config: &ServiceConfig, store: RecordStoreArc, gateway: MessagingGatewayArc) -> Self {
        Self {
            store,
            gateway,
            admin_id: config.admin_id,
        }
    }

    /// Applies an approve/reject action to a pending record.
    ///
    /// The status flip happens through the store's compare-and-set, so of
    /// any number of concurrent calls for one record exactly one observes
    /// `Decided`; the rest get `AlreadyDecided` and cause no notifications.
    pub async fn decide(
        &self,
        record_id: RecordId,
        action: DecisionAction,
        actor: UserId,
    ) -> Result<DecisionOutcome> {
        if actor != self.admin_id {
            warn!(record_id = %record_id, actor, "unauthorized decision attempt");
            return Err(PaymentError::Unauthorized(actor));
        }

        let record = self
            .store
            .get(record_id)
            .await?
            .ok_or(PaymentError::NotFound(record_id))?;

        let now = Utc::now();
        let change = match action {
            DecisionAction::Approve => StatusChange::approve(actor, now, record.validity),
            DecisionAction::Reject => StatusChange::reject(actor, now),
        };

        let record = match self.store.transition(record_id, change).await? {
            TransitionOutcome::Applied(record) => record,
            TransitionOutcome::AlreadyDecided(status) => {
                info!(record_id = %record_id, %status, "decision raced, already decided");
                return Ok(DecisionOutcome::AlreadyDecided { status });
            }
            TransitionOutcome::NotFound => return Err(PaymentError::NotFound(record_id)),
        };

        // From here on the transition is committed. Downstream delivery
        // failures are logged and swallowed; the store is never rolled back.
        let notice = match record.status {
            RecordStatus::Approved => OutcomeNotice::Approved {
                transaction_id: record.transaction_id.clone(),
                amount: record.amount,
                validity: record.validity,
                // Set in the same transition as the approval.
                expiry_at: record.expiry_at.unwrap_or(now),
            },
            _ => OutcomeNotice::Rejected {
                transaction_id: record.transaction_id.clone(),
            },
        };
        if let Err(err) = self.gateway.notify_submitter(record.user_id, &notice).await {
            warn!(
                record_id = %record.id,
                user_id = record.user_id,
                error = %err,
                "submitter notification failed"
            );
        }

        log_best_effort(
            self.gateway.as_ref(),
            &format!(
                "record {} (tx {}, user {}) {} by admin {actor}",
                record.id, record.transaction_id, record.user_id, record.status
            ),
        )
        .await;

        info!(record_id = %record.id, status = %record.status, "decision applied");
        Ok(DecisionOutcome::Decided { record })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ClaimSummary, MessagingGateway, RecordStore};
    use crate::domain::record::{Amount, Claim, ValidityPeriod};
    use crate::infrastructure::in_memory::InMemoryRecordStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        submitter: Mutex<Vec<(UserId, OutcomeNotice)>>,
        fail_submitter: bool,
    }

    #[async_trait]
    impl MessagingGateway for RecordingGateway {
        async fn notify_admin(&self, _summary: &ClaimSummary) -> Result<()> {
            Ok(())
        }

        async fn notify_submitter(&self, user_id: UserId, notice: &OutcomeNotice) -> Result<()> {
            if self.fail_submitter {
                return Err(PaymentError::InternalError(Box::new(
                    std::io::Error::other("submitter blocked the bot"),
                )));
            }
            self.submitter.lock().unwrap().push((user_id, notice.clone()));
            Ok(())
        }

        async fn notify_log(&self, _line: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn pending_record(store: &InMemoryRecordStore) -> PaymentRecord {
        let claim = Claim::new(
            1,
            "alice",
            "TX1",
            Amount::new(100).unwrap(),
            ValidityPeriod::parse(30, "days").unwrap(),
        )
        .unwrap();
        store.insert(claim, Utc::now()).await.unwrap()
    }

    fn engine(
        store: Arc<InMemoryRecordStore>,
        gateway: Arc<RecordingGateway>,
    ) -> DecisionEngine {
        DecisionEngine::new(&ServiceConfig::new(9), store, gateway)
    }

    #[tokio::test]
    async fn test_approval_sets_decision_fields_and_expiry() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let record = pending_record(&store).await;
        let engine = engine(store.clone(), gateway.clone());

        let outcome = engine
            .decide(record.id, DecisionAction::Approve, 9)
            .await
            .unwrap();
        let DecisionOutcome::Decided { record } = outcome else {
            panic!("expected decision");
        };

        assert_eq!(record.status, RecordStatus::Approved);
        assert_eq!(record.decided_by, Some(9));
        let decided_at = record.decided_at.unwrap();
        assert_eq!(
            record.expiry_at,
            Some(decided_at + chrono::Duration::days(30))
        );

        let notices = gateway.submitter.lock().unwrap();
        assert_eq!(notices.len(), 1);
        let (user_id, notice) = &notices[0];
        assert_eq!(*user_id, 1);
        let OutcomeNotice::Approved {
            amount, expiry_at, ..
        } = notice
        else {
            panic!("expected approval notice");
        };
        assert_eq!(amount.value(), 100);
        assert_eq!(*expiry_at, record.expiry_at.unwrap());
    }

    #[tokio::test]
    async fn test_rejection_leaves_expiry_unset() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let record = pending_record(&store).await;
        let engine = engine(store.clone(), gateway.clone());

        let outcome = engine
            .decide(record.id, DecisionAction::Reject, 9)
            .await
            .unwrap();
        let DecisionOutcome::Decided { record } = outcome else {
            panic!("expected decision");
        };
        assert_eq!(record.status, RecordStatus::Rejected);
        assert!(record.expiry_at.is_none());
        assert!(record.decided_at.is_some());
    }

    #[tokio::test]
    async fn test_unauthorized_caller_changes_nothing() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let record = pending_record(&store).await;
        let engine = engine(store.clone(), gateway.clone());

        let result = engine.decide(record.id, DecisionAction::Approve, 1234).await;
        assert!(matches!(result, Err(PaymentError::Unauthorized(1234))));

        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Pending);
        assert!(gateway.submitter.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(store, gateway);

        let result = engine
            .decide(RecordId(777), DecisionAction::Approve, 9)
            .await;
        assert!(matches!(result, Err(PaymentError::NotFound(RecordId(777)))));
    }

    #[tokio::test]
    async fn test_second_decision_is_a_soft_no_op() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let record = pending_record(&store).await;
        let engine = engine(store.clone(), gateway.clone());

        engine
            .decide(record.id, DecisionAction::Reject, 9)
            .await
            .unwrap();
        let outcome = engine
            .decide(record.id, DecisionAction::Approve, 9)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DecisionOutcome::AlreadyDecided {
                status: RecordStatus::Rejected
            }
        );

        // Exactly one submitter notification across both calls.
        assert_eq!(gateway.submitter.lock().unwrap().len(), 1);
        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Rejected);
    }

    #[tokio::test]
    async fn test_notification_failure_never_reverts_the_decision() {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(RecordingGateway {
            fail_submitter: true,
            ..Default::default()
        });
        let record = pending_record(&store).await;
        let engine = engine(store.clone(), gateway);

        let outcome = engine
            .decide(record.id, DecisionAction::Approve, 9)
            .await
            .unwrap();
        assert!(matches!(outcome, DecisionOutcome::Decided { .. }));

        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Approved);
    }
}
