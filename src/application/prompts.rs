//! Operator-facing texts and keyboards, plus the reply builder the engine uses.

use crate::domain::event::{Choice, InboundEvent, Prompt};
use crate::domain::identifier::Identifier;
use crate::domain::package::{Amount, Disposition};

pub const GREETING: &str = "Будь ласка надішліть фото з ШК або введіть ШК вручну.";
pub const SEND_PHOTO_OR_TEXT: &str = "Надішліть фото або введіть ШК вручну.";
pub const NOT_FOUND_ON_PHOTO: &str = "Не знайдено ШК на фото. Спробуйте ще чи введіть ШК вручну.";
pub const INVALID_BARCODE: &str = "Не коректний ШК. Спробуйте знову.";
pub const ALREADY_PROCESSED: &str = "Цей ШК уже був опрацьований.";
pub const CHOOSE_ACTION: &str = "Виберіть дію з посилкою:";
pub const ENTER_AMOUNT: &str = "Введіть суму:";
pub const INVALID_AMOUNT: &str = "Не коректна інформація. Введіть цифрове значення.";
pub const INVALID_CHOICE: &str = "Не коректний вибір.";
pub const SAVED: &str = "Інформація збережена успішно!";
pub const PRESS_START_NEXT: &str = "Натисніть 'Початок' для внесення нового ШК.";
pub const CANCELLED: &str = "Операцію скасовано.";
pub const PRESS_START_RETRY: &str = "Натисніть 'Початок' щоб спробувати знову.";
pub const PRESS_START: &str = "Натисніть 'Початок' щоб розпочати.";
pub const STORAGE_FAILURE: &str = "Не вдалося зберегти дані. Спробуйте ще раз пізніше.";

pub const START_LABEL: &str = "Початок";
pub const CANCEL_LABEL: &str = "Скасувати";
pub const CONFIRM_LABEL: &str = "Підтвердити";

pub const START_TAG: &str = "start";
pub const CANCEL_TAG: &str = "cancel";
pub const CONFIRM_TAG: &str = "confirm";

/// The persistent start/cancel keyboard.
pub fn main_keyboard() -> Vec<Choice> {
    vec![
        Choice::new(START_LABEL, START_TAG),
        Choice::new(CANCEL_LABEL, CANCEL_TAG),
    ]
}

pub fn action_keyboard() -> Vec<Choice> {
    Disposition::ALL
        .iter()
        .map(|d| Choice::new(d.label(), d.tag()))
        .chain(std::iter::once(Choice::new(CANCEL_LABEL, CANCEL_TAG)))
        .collect()
}

pub fn confirm_keyboard() -> Vec<Choice> {
    vec![
        Choice::new(CONFIRM_LABEL, CONFIRM_TAG),
        Choice::new(CANCEL_LABEL, CANCEL_TAG),
    ]
}

pub fn confirmation_summary(
    identifier: &Identifier,
    disposition: Disposition,
    amount: Option<Amount>,
) -> String {
    let mut text = format!(
        "Підтвердьте деталі:\nШК: {identifier}\nДія: {}",
        disposition.label()
    );
    if let Some(amount) = amount {
        text.push_str(&format!("\nСума: {amount}"));
    }
    text
}

/// Collects the prompts answering one inbound event.
///
/// The first prompt edits the previous bot message when the event was a button
/// press; every later prompt is a new message.
#[derive(Debug)]
pub struct Reply {
    chat_id: i64,
    edit_first: bool,
    prompts: Vec<Prompt>,
}

impl Reply {
    pub fn to(event: &InboundEvent) -> Self {
        Self {
            chat_id: event.chat_id,
            edit_first: event.is_button_press(),
            prompts: Vec::new(),
        }
    }

    pub fn push(&mut self, text: impl Into<String>, choices: Vec<Choice>) {
        let replace_previous = self.edit_first && self.prompts.is_empty();
        self.prompts.push(Prompt {
            chat_id: self.chat_id,
            text: text.into(),
            choices,
            replace_previous,
        });
    }

    pub fn edits_previous(&self) -> bool {
        self.edit_first
    }

    pub fn into_prompts(self) -> Vec<Prompt> {
        self.prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventKind;
    use crate::domain::package::Submitter;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_first_prompt_edits_after_button_press() {
        let event = InboundEvent::new(
            Submitter::new(1),
            10,
            EventKind::ButtonPress(CANCEL_TAG.to_string()),
        );
        let mut reply = Reply::to(&event);
        reply.push(CANCELLED, vec![]);
        reply.push(PRESS_START_RETRY, main_keyboard());

        let prompts = reply.into_prompts();
        assert!(prompts[0].replace_previous);
        assert!(!prompts[1].replace_previous);
        assert_eq!(prompts[1].chat_id, 10);
    }

    #[test]
    fn test_text_replies_are_new_messages() {
        let event = InboundEvent::new(Submitter::new(1), 10, EventKind::Text("hi".into()));
        let mut reply = Reply::to(&event);
        reply.push(GREETING, main_keyboard());
        assert!(!reply.into_prompts()[0].replace_previous);
    }

    #[test]
    fn test_action_keyboard_offers_every_disposition_and_cancel() {
        let tags: Vec<_> = action_keyboard().into_iter().map(|c| c.tag).collect();
        assert_eq!(tags, ["delivered", "returned", "payment", "cancel"]);
    }

    #[test]
    fn test_confirmation_summary() {
        let id = Identifier::parse("AB1234567").unwrap();
        let without = confirmation_summary(&id, Disposition::Delivered, None);
        assert!(without.contains("ШК: AB1234567"));
        assert!(!without.contains("Сума"));

        let amount = Amount::new(dec!(150.5)).unwrap();
        let with = confirmation_summary(&id, Disposition::Payment, Some(amount));
        assert!(with.ends_with("Сума: 150.5"));
    }
}
