use super::identifier::Identifier;
use super::package::{Amount, Disposition, NewPackage, Submitter};
use std::time::{Duration, Instant};

/// Where a user currently is in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// No active session.
    Idle,
    AwaitingIdentifier,
    AwaitingAction,
    AwaitingPaymentAmount,
    AwaitingConfirmation,
}

/// Dialogue position together with the data captured so far.
///
/// Each variant carries exactly what the next step needs, so a package can only
/// be built from a session that went through every required prompt.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage {
    #[default]
    Idle,
    AwaitingIdentifier,
    AwaitingAction {
        identifier: Identifier,
    },
    AwaitingPaymentAmount {
        identifier: Identifier,
    },
    AwaitingConfirmation {
        identifier: Identifier,
        disposition: Disposition,
        amount: Option<Amount>,
    },
}

impl Stage {
    pub fn state(&self) -> DialogState {
        match self {
            Self::Idle => DialogState::Idle,
            Self::AwaitingIdentifier => DialogState::AwaitingIdentifier,
            Self::AwaitingAction { .. } => DialogState::AwaitingAction,
            Self::AwaitingPaymentAmount { .. } => DialogState::AwaitingPaymentAmount,
            Self::AwaitingConfirmation { .. } => DialogState::AwaitingConfirmation,
        }
    }
}

/// Per-user transient dialogue data. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    stage: Stage,
    last_seen: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            last_seen: Instant::now(),
        }
    }

    pub fn state(&self) -> DialogState {
        self.stage.state()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        match &self.stage {
            Stage::Idle | Stage::AwaitingIdentifier => None,
            Stage::AwaitingAction { identifier }
            | Stage::AwaitingPaymentAmount { identifier }
            | Stage::AwaitingConfirmation { identifier, .. } => Some(identifier),
        }
    }

    pub fn disposition(&self) -> Option<Disposition> {
        match &self.stage {
            Stage::AwaitingPaymentAmount { .. } => Some(Disposition::Payment),
            Stage::AwaitingConfirmation { disposition, .. } => Some(*disposition),
            _ => None,
        }
    }

    pub fn amount(&self) -> Option<Amount> {
        match &self.stage {
            Stage::AwaitingConfirmation { amount, .. } => *amount,
            _ => None,
        }
    }

    /// Replaces whatever was in progress with a fresh identifier prompt.
    pub fn restart(&mut self) {
        self.stage = Stage::AwaitingIdentifier;
    }

    pub fn clear(&mut self) {
        self.stage = Stage::Idle;
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// The package this session would commit, if it reached confirmation.
    pub fn pending_package(&self, submitter: Submitter) -> Option<NewPackage> {
        match &self.stage {
            Stage::AwaitingConfirmation {
                identifier,
                disposition,
                amount,
            } => Some(NewPackage::new(
                identifier.clone(),
                *disposition,
                *amount,
                submitter,
            )),
            _ => None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), DialogState::Idle);
        assert!(session.identifier().is_none());
        assert!(session.pending_package(Submitter::new(1)).is_none());
    }

    #[test]
    fn test_accessors_follow_stage() {
        let identifier = Identifier::parse("AB1234567").unwrap();
        let mut session = Session::new();

        session.set_stage(Stage::AwaitingPaymentAmount {
            identifier: identifier.clone(),
        });
        assert_eq!(session.identifier(), Some(&identifier));
        assert_eq!(session.disposition(), Some(Disposition::Payment));
        assert_eq!(session.amount(), None);

        let amount = Amount::new(dec!(150.5)).unwrap();
        session.set_stage(Stage::AwaitingConfirmation {
            identifier: identifier.clone(),
            disposition: Disposition::Payment,
            amount: Some(amount),
        });
        assert_eq!(session.amount(), Some(amount));

        let package = session.pending_package(Submitter::new(7)).unwrap();
        assert_eq!(package.identifier, identifier);
        assert_eq!(package.amount, amount);
        assert_eq!(package.submitter.id, 7);
    }

    #[test]
    fn test_restart_discards_progress() {
        let mut session = Session::new();
        session.set_stage(Stage::AwaitingAction {
            identifier: Identifier::parse("AB1234567").unwrap(),
        });
        session.restart();
        assert_eq!(session.state(), DialogState::AwaitingIdentifier);
        assert!(session.identifier().is_none());
    }

    #[test]
    fn test_expiry() {
        let mut session = Session::new();
        let start = Instant::now();
        session.touch(start);
        let timeout = Duration::from_secs(60);
        assert!(!session.is_expired(start + Duration::from_secs(60), timeout));
        assert!(session.is_expired(start + Duration::from_secs(61), timeout));
    }
}
