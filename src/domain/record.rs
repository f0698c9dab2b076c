use crate::error::{PaymentError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned identifier for a payment record.
///
/// Opaque to callers; rendered as fixed-width hex so notifications carry a
/// handle rather than a row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        u64::from_str_radix(s.trim(), 16)
            .map(RecordId)
            .map_err(|_| PaymentError::ValidationError(format!("invalid record id `{s}`")))
    }
}

/// Chat-platform identity of a submitter or administrator.
pub type UserId = i64;

/// A positive payment amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Amount {
    type Error = PaymentError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
}

impl PeriodUnit {
    /// Fixed day-multiple for expiry arithmetic. Months and years are
    /// normalized to 30 and 365 days, not calendar-aware.
    pub fn days(&self) -> i64 {
        match self {
            PeriodUnit::Day => 1,
            PeriodUnit::Month => 30,
            PeriodUnit::Year => 365,
        }
    }
}

impl FromStr for PeriodUnit {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.strip_suffix('s').unwrap_or(&normalized) {
            "day" => Ok(PeriodUnit::Day),
            "month" => Ok(PeriodUnit::Month),
            "year" => Ok(PeriodUnit::Year),
            _ => Err(PaymentError::ValidationError(format!(
                "unknown period unit `{s}`"
            ))),
        }
    }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodUnit::Day => write!(f, "day"),
            PeriodUnit::Month => write!(f, "month"),
            PeriodUnit::Year => write!(f, "year"),
        }
    }
}

/// How long an approved payment stays valid, as count + unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityPeriod {
    pub count: u32,
    pub unit: PeriodUnit,
}

impl ValidityPeriod {
    pub fn new(count: u32, unit: PeriodUnit) -> Result<Self> {
        if count > 0 {
            Ok(Self { count, unit })
        } else {
            Err(PaymentError::ValidationError(
                "period count must be positive".to_string(),
            ))
        }
    }

    /// Parses the text extractor's `{period_count, period_unit}` output.
    pub fn parse(count: u32, unit: &str) -> Result<Self> {
        Self::new(count, unit.parse()?)
    }

    pub fn duration(&self) -> Duration {
        Duration::days(i64::from(self.count) * self.unit.days())
    }
}

impl fmt::Display for ValidityPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "1 {}", self.unit)
        } else {
            write!(f, "{} {}s", self.count, self.unit)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RecordStatus {
    /// Every status but `Pending` is terminal; no edge leaves them.
    pub fn is_terminal(&self) -> bool {
        *self != RecordStatus::Pending
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Pending => write!(f, "pending"),
            RecordStatus::Approved => write!(f, "approved"),
            RecordStatus::Rejected => write!(f, "rejected"),
            RecordStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A validated submission, as produced by the text extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub user_id: UserId,
    pub username: String,
    pub transaction_id: String,
    pub amount: Amount,
    pub validity: ValidityPeriod,
}

impl Claim {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        transaction_id: impl Into<String>,
        amount: Amount,
        validity: ValidityPeriod,
    ) -> Result<Self> {
        let transaction_id = transaction_id.into().trim().to_string();
        if transaction_id.is_empty() {
            return Err(PaymentError::ValidationError(
                "transaction id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            user_id,
            username: username.into(),
            transaction_id,
            amount,
            validity,
        })
    }
}

/// The persisted payment record.
///
/// `status` only ever moves `Pending -> {Approved, Rejected, Cancelled}`
/// through [`StatusChange`] applied by a store's compare-and-set transition.
/// `decided_at`, `decided_by` and `expiry_at` are written together with that
/// flip and never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub username: String,
    pub transaction_id: String,
    pub amount: Amount,
    pub validity: ValidityPeriod,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<UserId>,
    pub expiry_at: Option<DateTime<Utc>>,
    pub screenshot_ref: Option<String>,
}

impl PaymentRecord {
    pub fn new(id: RecordId, claim: Claim, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: claim.user_id,
            username: claim.username,
            transaction_id: claim.transaction_id,
            amount: claim.amount,
            validity: claim.validity,
            status: RecordStatus::Pending,
            created_at,
            decided_at: None,
            decided_by: None,
            expiry_at: None,
            screenshot_ref: None,
        }
    }

    /// True for an approval whose validity window covers `now`.
    pub fn is_active_approval(&self, now: DateTime<Utc>) -> bool {
        self.status == RecordStatus::Approved && self.expiry_at.is_some_and(|e| e > now)
    }

    /// Applies a validated status change. Callers (stores) must have checked
    /// that the current status is still `Pending`.
    pub(crate) fn apply(&mut self, change: &StatusChange) {
        self.status = change.to;
        self.decided_at = Some(change.decided_at);
        self.decided_by = Some(change.decided_by);
        self.expiry_at = change.expiry_at;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionAction {
    Approve,
    Reject,
}

impl FromStr for DecisionAction {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(DecisionAction::Approve),
            "reject" => Ok(DecisionAction::Reject),
            _ => Err(PaymentError::ValidationError(format!(
                "unknown decision action `{s}`"
            ))),
        }
    }
}

/// Payload of the compare-and-set transition out of `Pending`.
///
/// Constructed only through [`StatusChange::approve`], [`StatusChange::reject`]
/// and [`StatusChange::cancel`], so expiry can only accompany an approval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
    pub to: RecordStatus,
    pub decided_by: UserId,
    pub decided_at: DateTime<Utc>,
    pub expiry_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn approve(admin: UserId, now: DateTime<Utc>, validity: ValidityPeriod) -> Self {
        Self {
            to: RecordStatus::Approved,
            decided_by: admin,
            decided_at: now,
            expiry_at: Some(now + validity.duration()),
        }
    }

    pub fn reject(admin: UserId, now: DateTime<Utc>) -> Self {
        Self {
            to: RecordStatus::Rejected,
            decided_by: admin,
            decided_at: now,
            expiry_at: None,
        }
    }

    pub fn cancel(user: UserId, now: DateTime<Utc>) -> Self {
        Self {
            to: RecordStatus::Cancelled,
            decided_by: user,
            decided_at: now,
            expiry_at: None,
        }
    }

    /// Store-side guard against hand-built changes that re-enter `Pending`
    /// or attach expiry to a non-approval.
    pub fn validate(&self) -> Result<()> {
        let expiry_ok = match self.to {
            RecordStatus::Approved => self.expiry_at.is_some(),
            _ => self.expiry_at.is_none(),
        };
        if self.to == RecordStatus::Pending || !expiry_ok {
            return Err(PaymentError::InvalidTransition(self.to));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        assert!(Amount::new(1).is_ok());
        assert!(matches!(
            Amount::new(0),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_period_unit_parsing_tolerates_case_and_plural() {
        assert_eq!("day".parse::<PeriodUnit>().unwrap(), PeriodUnit::Day);
        assert_eq!("Days".parse::<PeriodUnit>().unwrap(), PeriodUnit::Day);
        assert_eq!("MONTH".parse::<PeriodUnit>().unwrap(), PeriodUnit::Month);
        assert_eq!("years".parse::<PeriodUnit>().unwrap(), PeriodUnit::Year);
        assert!("fortnight".parse::<PeriodUnit>().is_err());
    }

    #[test]
    fn test_validity_normalizes_to_fixed_day_multiples() {
        // Policy: month = 30 days, year = 365 days, never calendar-aware.
        let days = ValidityPeriod::parse(30, "days").unwrap();
        assert_eq!(days.duration(), Duration::days(30));
        let months = ValidityPeriod::parse(2, "months").unwrap();
        assert_eq!(months.duration(), Duration::days(60));
        let years = ValidityPeriod::parse(1, "year").unwrap();
        assert_eq!(years.duration(), Duration::days(365));
    }

    #[test]
    fn test_claim_rejects_blank_transaction_id() {
        let validity = ValidityPeriod::parse(30, "days").unwrap();
        let result = Claim::new(1, "alice", "   ", Amount::new(100).unwrap(), validity);
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[test]
    fn test_status_change_constructors() {
        let now = Utc::now();
        let validity = ValidityPeriod::parse(30, "days").unwrap();

        let approve = StatusChange::approve(9, now, validity);
        assert_eq!(approve.to, RecordStatus::Approved);
        assert_eq!(approve.expiry_at, Some(now + Duration::days(30)));
        assert!(approve.validate().is_ok());

        let reject = StatusChange::reject(9, now);
        assert_eq!(reject.expiry_at, None);
        assert!(reject.validate().is_ok());

        let cancel = StatusChange::cancel(1, now);
        assert_eq!(cancel.to, RecordStatus::Cancelled);
        assert!(cancel.validate().is_ok());
    }

    #[test]
    fn test_status_change_validation_refuses_malformed() {
        let now = Utc::now();
        let mut change = StatusChange::reject(9, now);
        change.expiry_at = Some(now);
        assert!(matches!(
            change.validate(),
            Err(PaymentError::InvalidTransition(RecordStatus::Rejected))
        ));

        change.to = RecordStatus::Pending;
        assert!(change.validate().is_err());
    }

    #[test]
    fn test_record_id_display_round_trip() {
        let id = RecordId(48879);
        let rendered = id.to_string();
        assert_eq!(rendered, "0000beef");
        assert_eq!(rendered.parse::<RecordId>().unwrap(), id);
    }
}
