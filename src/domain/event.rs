use super::package::Submitter;
use serde::{Deserialize, Serialize};

/// What the messaging gateway delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Start,
    Text(String),
    /// Raw image bytes.
    Photo(Vec<u8>),
    /// The tag of an inline button the user pressed.
    ButtonPress(String),
    Cancel,
}

/// An inbound event addressed to one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub submitter: Submitter,
    pub chat_id: i64,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(submitter: Submitter, chat_id: i64, kind: EventKind) -> Self {
        Self {
            submitter,
            chat_id,
            kind,
        }
    }

    pub fn is_button_press(&self) -> bool {
        matches!(self.kind, EventKind::ButtonPress(_))
    }
}

/// A button offered with a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub tag: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tag: tag.into(),
        }
    }
}

/// An outbound render request for the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub chat_id: i64,
    pub text: String,
    pub choices: Vec<Choice>,
    /// Edit the last bot message instead of sending a new one.
    pub replace_previous: bool,
}

impl Prompt {
    pub fn has_choice(&self, tag: &str) -> bool {
        self.choices.iter().any(|c| c.tag == tag)
    }
}
