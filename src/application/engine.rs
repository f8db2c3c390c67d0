use super::prompts::{self, Reply};
use super::sessions::SessionStore;
use crate::domain::conversation::{DialogState, Session, Stage};
use crate::domain::event::{EventKind, InboundEvent, Prompt};
use crate::domain::identifier::Identifier;
use crate::domain::package::{Amount, Disposition, Submitter};
use crate::domain::ports::{DecoderBox, LedgerBox};
use crate::error::{ParcelError, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An inbound event reduced to what the dialogue cares about.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Start,
    Cancel,
    Confirm,
    Choose(Disposition),
    Text(String),
    Photo(Vec<u8>),
    Unrecognized,
}

impl Input {
    fn classify(kind: EventKind) -> Self {
        match kind {
            EventKind::Start => Self::Start,
            EventKind::Cancel => Self::Cancel,
            EventKind::Photo(image) => Self::Photo(image),
            EventKind::Text(text) => {
                let phrase = text.trim().to_lowercase();
                if phrase == "/start" || phrase == prompts::START_LABEL.to_lowercase() {
                    Self::Start
                } else if phrase == "/cancel" || phrase == prompts::CANCEL_LABEL.to_lowercase() {
                    Self::Cancel
                } else {
                    Self::Text(text)
                }
            }
            EventKind::ButtonPress(tag) => match tag.as_str() {
                prompts::START_TAG => Self::Start,
                prompts::CANCEL_TAG => Self::Cancel,
                prompts::CONFIRM_TAG => Self::Confirm,
                other => Disposition::from_tag(other).map_or(Self::Unrecognized, Self::Choose),
            },
        }
    }
}

/// Drives every operator's dialogue and commits confirmed packages.
///
/// `ConversationEngine` owns the ledger, the barcode decoder and the session
/// store. Events of one user are applied strictly in order because the user's
/// session stays locked for the whole event; events of different users run
/// concurrently. Every event gets at least one prompt back.
pub struct ConversationEngine {
    ledger: LedgerBox,
    decoder: DecoderBox,
    sessions: Arc<SessionStore>,
}

impl ConversationEngine {
    /// Creates a new `ConversationEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Where confirmed packages are committed.
    /// * `decoder` - Extracts barcodes from submitted photos.
    /// * `sessions` - Per-user dialogue state.
    pub fn new(ledger: LedgerBox, decoder: DecoderBox, sessions: Arc<SessionStore>) -> Self {
        Self {
            ledger,
            decoder,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Current dialogue state of a user; `Idle` if they never wrote.
    pub async fn state_of(&self, user_id: i64) -> DialogState {
        self.sessions
            .snapshot(user_id)
            .await
            .map_or(DialogState::Idle, |s| s.state())
    }

    /// Applies one inbound event and returns the prompts to render, in order.
    pub async fn handle(&self, event: InboundEvent) -> Vec<Prompt> {
        let mut reply = Reply::to(&event);
        let InboundEvent {
            submitter, kind, ..
        } = event;
        let user_id = submitter.id;

        let mut session = self.sessions.acquire(user_id).await;
        let before = session.state();
        let input = Input::classify(kind);

        match (session.stage().clone(), input) {
            (_, Input::Start) => {
                session.restart();
                reply.push(prompts::GREETING, prompts::main_keyboard());
            }
            (_, Input::Cancel) => self.cancel(&mut session, &mut reply),

            (Stage::Idle, _) => reply.push(prompts::PRESS_START, prompts::main_keyboard()),

            (Stage::AwaitingIdentifier, Input::Text(text)) => {
                let outcome = self.accept_identifier(&text).await;
                self.apply_identifier(&mut session, outcome, &mut reply);
            }
            (Stage::AwaitingIdentifier, Input::Photo(image)) => {
                let outcome = match self.decoder.decode(&image).await {
                    // Decoded barcodes obey the same 8..=20 length rule as typed ones.
                    Some(decoded) => self.accept_identifier(&decoded).await,
                    None => Err(ParcelError::DecoderFailure),
                };
                self.apply_identifier(&mut session, outcome, &mut reply);
            }
            (Stage::AwaitingIdentifier, _) => {
                reply.push(prompts::SEND_PHOTO_OR_TEXT, prompts::main_keyboard())
            }

            (Stage::AwaitingAction { identifier }, Input::Choose(Disposition::Payment)) => {
                session.set_stage(Stage::AwaitingPaymentAmount { identifier });
                reply.push(prompts::ENTER_AMOUNT, vec![]);
            }
            (Stage::AwaitingAction { identifier }, Input::Choose(disposition)) => {
                reply.push(
                    prompts::confirmation_summary(&identifier, disposition, None),
                    prompts::confirm_keyboard(),
                );
                session.set_stage(Stage::AwaitingConfirmation {
                    identifier,
                    disposition,
                    amount: None,
                });
            }
            (Stage::AwaitingAction { .. }, _) => {
                reply.push(prompts::CHOOSE_ACTION, prompts::action_keyboard())
            }

            (Stage::AwaitingPaymentAmount { identifier }, Input::Text(text)) => {
                match Amount::parse(&text) {
                    Ok(amount) => {
                        reply.push(
                            prompts::confirmation_summary(
                                &identifier,
                                Disposition::Payment,
                                Some(amount),
                            ),
                            prompts::confirm_keyboard(),
                        );
                        session.set_stage(Stage::AwaitingConfirmation {
                            identifier,
                            disposition: Disposition::Payment,
                            amount: Some(amount),
                        });
                    }
                    Err(e) => {
                        debug!(user_id, error = %e, "rejected payment amount");
                        reply.push(prompts::INVALID_AMOUNT, vec![]);
                    }
                }
            }
            (Stage::AwaitingPaymentAmount { .. }, _) => reply.push(prompts::ENTER_AMOUNT, vec![]),

            (Stage::AwaitingConfirmation { .. }, Input::Confirm) => {
                self.commit(&mut session, submitter, &mut reply).await
            }
            (
                Stage::AwaitingConfirmation {
                    identifier,
                    disposition,
                    amount,
                },
                _,
            ) => {
                reply.push(prompts::INVALID_CHOICE, vec![]);
                reply.push(
                    prompts::confirmation_summary(&identifier, disposition, amount),
                    prompts::confirm_keyboard(),
                );
            }
        }

        debug!(user_id, from = ?before, to = ?session.state(), "dialogue step");
        reply.into_prompts()
    }

    /// Validates a submitted barcode and rejects ones already in the ledger.
    async fn accept_identifier(&self, raw: &str) -> Result<Identifier> {
        let identifier = Identifier::parse(raw)?;
        if self.ledger.exists(&identifier).await? {
            return Err(ParcelError::DuplicateIdentifier(identifier.to_string()));
        }
        Ok(identifier)
    }

    fn apply_identifier(
        &self,
        session: &mut Session,
        outcome: Result<Identifier>,
        reply: &mut Reply,
    ) {
        match outcome {
            Ok(identifier) => {
                debug!(barcode = %identifier, "barcode accepted");
                session.set_stage(Stage::AwaitingAction { identifier });
                reply.push(prompts::CHOOSE_ACTION, prompts::action_keyboard());
            }
            Err(ParcelError::DecoderFailure) => {
                reply.push(prompts::NOT_FOUND_ON_PHOTO, prompts::main_keyboard())
            }
            Err(ParcelError::ValidationError(reason)) => {
                debug!(%reason, "rejected barcode");
                reply.push(prompts::INVALID_BARCODE, prompts::main_keyboard());
            }
            Err(ParcelError::DuplicateIdentifier(barcode)) => {
                info!(%barcode, "barcode already processed");
                reply.push(prompts::ALREADY_PROCESSED, prompts::main_keyboard());
            }
            Err(e) => {
                error!(error = %e, "duplicate lookup failed");
                reply.push(prompts::STORAGE_FAILURE, prompts::main_keyboard());
            }
        }
    }

    async fn commit(&self, session: &mut Session, submitter: Submitter, reply: &mut Reply) {
        let Some(package) = session.pending_package(submitter) else {
            reply.push(prompts::PRESS_START, prompts::main_keyboard());
            return;
        };

        match self.ledger.commit(package).await {
            Ok(record) => {
                info!(
                    barcode = %record.identifier,
                    disposition = %record.disposition,
                    amount = %record.amount,
                    user_id = record.submitter.id,
                    "package committed"
                );
                session.clear();
                reply.push(prompts::SAVED, vec![]);
                reply.push(prompts::PRESS_START_NEXT, prompts::main_keyboard());
            }
            Err(ParcelError::DuplicateIdentifier(barcode)) => {
                // Another operator confirmed the same barcode first.
                warn!(%barcode, "barcode committed concurrently");
                session.restart();
                reply.push(prompts::ALREADY_PROCESSED, vec![]);
                reply.push(prompts::GREETING, prompts::main_keyboard());
            }
            Err(e) => {
                error!(error = %e, "failed to commit package");
                reply.push(prompts::STORAGE_FAILURE, prompts::confirm_keyboard());
            }
        }
    }

    /// Clears the session unconditionally. Idempotent.
    fn cancel(&self, session: &mut Session, reply: &mut Reply) {
        session.clear();
        if reply.edits_previous() {
            reply.push(prompts::CANCELLED, vec![]);
            reply.push(prompts::PRESS_START_RETRY, prompts::main_keyboard());
        } else {
            reply.push(prompts::CANCELLED, prompts::main_keyboard());
        }
    }
}
