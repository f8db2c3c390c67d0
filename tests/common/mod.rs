#![allow(dead_code)]

use parcel_desk::domain::event::{EventKind, InboundEvent};
use parcel_desk::domain::package::Submitter;
use std::fs::File;
use std::io::Error;
use std::path::Path;

/// Writes a gateway event log for `parcel-desk replay`.
///
/// Each row is `(user_id, kind, payload)`; the chat id is `user_id * 10`.
pub fn write_events(path: &Path, rows: &[(i64, &str, &str)]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record([
        "user_id",
        "username",
        "first_name",
        "last_name",
        "chat_id",
        "kind",
        "payload",
    ])?;

    for &(user_id, kind, payload) in rows {
        let user = user_id.to_string();
        let username = format!("operator{user_id}");
        let chat = (user_id * 10).to_string();
        wtr.write_record([
            user.as_str(),
            username.as_str(),
            "",
            "",
            chat.as_str(),
            kind,
            payload,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// The full delivered/returned path for one barcode.
pub fn confirmed_path<'a>(user_id: i64, barcode: &'a str, action: &'a str) -> Vec<(i64, &'a str, &'a str)> {
    vec![
        (user_id, "start", ""),
        (user_id, "text", barcode),
        (user_id, "button", action),
        (user_id, "button", "confirm"),
    ]
}

pub fn event(user_id: i64, kind: EventKind) -> InboundEvent {
    InboundEvent::new(Submitter::new(user_id), user_id * 10, kind)
}

pub fn text(user_id: i64, body: &str) -> InboundEvent {
    event(user_id, EventKind::Text(body.to_string()))
}

pub fn button(user_id: i64, tag: &str) -> InboundEvent {
    event(user_id, EventKind::ButtonPress(tag.to_string()))
}
