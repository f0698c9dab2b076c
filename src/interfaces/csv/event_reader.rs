use crate::application::service::InboundEvent;
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

/// One CSV row of the replay format. Columns that do not apply to an event
/// kind are left empty:
///
/// ```text
/// event,user_id,username,transaction_id,amount,period_count,period_unit,record_id,action,image_ref,choice
/// submission,1,alice,TX1,100,30,days,,,,
/// admin,9,,,,,,00000001,approve,,
/// ```
#[derive(Debug, Deserialize)]
struct EventRow {
    event: String,
    user_id: Option<i64>,
    username: Option<String>,
    transaction_id: Option<String>,
    amount: Option<u64>,
    period_count: Option<u32>,
    period_unit: Option<String>,
    record_id: Option<String>,
    action: Option<String>,
    image_ref: Option<String>,
    choice: Option<String>,
}

fn require<T>(field: Option<T>, name: &str, event: &str) -> Result<T> {
    field.ok_or_else(|| {
        PaymentError::ValidationError(format!("{event} event is missing `{name}`"))
    })
}

impl TryFrom<EventRow> for InboundEvent {
    type Error = PaymentError;

    fn try_from(row: EventRow) -> Result<Self> {
        let event = row.event.trim().to_ascii_lowercase();
        let user_id = require(row.user_id, "user_id", &event)?;
        match event.as_str() {
            "submission" => Ok(InboundEvent::Submission {
                user_id,
                username: require(row.username, "username", &event)?,
                transaction_id: require(row.transaction_id, "transaction_id", &event)?,
                amount: require(row.amount, "amount", &event)?,
                period_count: require(row.period_count, "period_count", &event)?,
                period_unit: require(row.period_unit, "period_unit", &event)?,
            }),
            "choice" => Ok(InboundEvent::Choice {
                user_id,
                choice: require(row.choice, "choice", &event)?.parse()?,
            }),
            "cancel" => Ok(InboundEvent::Cancel { user_id }),
            "attachment" => Ok(InboundEvent::Attachment {
                user_id,
                image_ref: require(row.image_ref, "image_ref", &event)?,
                reply_to: row.record_id.as_deref().map(str::parse).transpose()?,
            }),
            "admin" => Ok(InboundEvent::AdminAction {
                actor: user_id,
                record_id: require(row.record_id, "record_id", &event)?.parse()?,
                action: require(row.action, "action", &event)?.parse()?,
            }),
            other => Err(PaymentError::ValidationError(format!(
                "unknown event kind `{other}`"
            ))),
        }
    }
}

/// Reads inbound events from a CSV source.
///
/// Wraps `csv::Reader` and yields an iterator of `Result<InboundEvent>`;
/// whitespace is trimmed and short rows are tolerated.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts events, so large replay files stream.
    pub fn events(self) -> impl Iterator<Item = Result<InboundEvent>> {
        self.reader
            .into_deserialize::<EventRow>()
            .map(|result| {
                result
                    .map_err(PaymentError::from)
                    .and_then(InboundEvent::try_from)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::intake::ConflictChoice;
    use crate::domain::record::{DecisionAction, RecordId};

    const HEADER: &str = "event,user_id,username,transaction_id,amount,period_count,period_unit,record_id,action,image_ref,choice";

    #[test]
    fn test_reads_submission_and_admin_rows() {
        let data = format!(
            "{HEADER}\nsubmission,1,alice,TX1,100,30,days,,,,\nadmin,9,,,,,,0000002a,approve,,"
        );
        let events: Vec<_> = EventReader::new(data.as_bytes()).events().collect();

        assert_eq!(events.len(), 2);
        let InboundEvent::Submission {
            user_id,
            transaction_id,
            amount,
            ..
        } = events[0].as_ref().unwrap()
        else {
            panic!("expected submission");
        };
        assert_eq!(*user_id, 1);
        assert_eq!(transaction_id, "TX1");
        assert_eq!(*amount, 100);

        let InboundEvent::AdminAction {
            actor,
            record_id,
            action,
        } = events[1].as_ref().unwrap()
        else {
            panic!("expected admin action");
        };
        assert_eq!(*actor, 9);
        assert_eq!(*record_id, RecordId(42));
        assert_eq!(*action, DecisionAction::Approve);
    }

    #[test]
    fn test_reads_choice_cancel_and_attachment_rows() {
        let data = format!(
            "{HEADER}\nchoice,1,,,,,,,,,replace\ncancel,2,,,,,,,,,\nattachment,3,,,,,,,,file-9,"
        );
        let events: Vec<_> = EventReader::new(data.as_bytes())
            .events()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(
            events[0],
            InboundEvent::Choice {
                user_id: 1,
                choice: ConflictChoice::Proceed
            }
        );
        assert_eq!(events[1], InboundEvent::Cancel { user_id: 2 });
        assert_eq!(
            events[2],
            InboundEvent::Attachment {
                user_id: 3,
                image_ref: "file-9".to_string(),
                reply_to: None
            }
        );
    }

    #[test]
    fn test_malformed_rows_surface_as_errors() {
        let data = format!("{HEADER}\nsubmission,1,alice,TX1,,30,days,,,,\nwibble,1,,,,,,,,,");
        let events: Vec<_> = EventReader::new(data.as_bytes()).events().collect();

        assert!(events[0].is_err(), "missing amount should fail");
        assert!(events[1].is_err(), "unknown kind should fail");
    }
}
