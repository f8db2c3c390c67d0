use crate::domain::event::{EventKind, InboundEvent};
use crate::domain::package::Submitter;
use crate::error::{ParcelError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Start,
    Text,
    Photo,
    Button,
    Cancel,
}

/// One line of a recorded gateway session.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub chat_id: i64,
    pub kind: EventType,
    pub payload: Option<String>,
}

impl TryFrom<EventRow> for InboundEvent {
    type Error = ParcelError;

    fn try_from(row: EventRow) -> Result<Self> {
        let kind = match (row.kind, row.payload) {
            (EventType::Start, _) => EventKind::Start,
            (EventType::Cancel, _) => EventKind::Cancel,
            (EventType::Text, payload) => EventKind::Text(payload.unwrap_or_default()),
            // Photos carry the image payload inline.
            (EventType::Photo, payload) => {
                EventKind::Photo(payload.unwrap_or_default().into_bytes())
            }
            (EventType::Button, Some(tag)) => EventKind::ButtonPress(tag),
            (EventType::Button, None) => {
                return Err(ParcelError::ValidationError(
                    "Button event without a tag".to_string(),
                ));
            }
        };

        let submitter = Submitter {
            id: row.user_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
        };
        Ok(InboundEvent::new(submitter, row.chat_id, kind))
    }
}

/// Reads inbound gateway events from a CSV source.
///
/// Expects the header `user_id,username,first_name,last_name,chat_id,kind,payload`.
/// Whitespace around fields is trimmed and short records are accepted.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts events.
    pub fn events(self) -> impl Iterator<Item = Result<InboundEvent>> {
        self.reader
            .into_deserialize::<EventRow>()
            .map(|result| result.map_err(ParcelError::from).and_then(InboundEvent::try_from))
    }
}
