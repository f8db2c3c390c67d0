use super::identifier::Identifier;
use crate::error::{ParcelError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome chosen for a package.
///
/// The lowercase names double as button tags and as the stored `status` value.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Delivered,
    Returned,
    /// Payment collected on delivery; the only disposition carrying an amount.
    Payment,
}

impl Disposition {
    pub const ALL: [Disposition; 3] = [Self::Delivered, Self::Returned, Self::Payment];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Payment => "payment",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.tag() == tag)
    }

    /// Human-facing label shown on buttons and in confirmation summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered => "Доставлено",
            Self::Returned => "Повернено",
            Self::Payment => "Оплата",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A non-negative monetary amount collected for a package.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Amount(Decimal);

/// Most decimal places an amount may carry.
pub const MAX_SCALE: u32 = 2;
/// Most significant digits an amount may carry, so it stays exact as an `f64`.
pub const MAX_DIGITS: u32 = 15;

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Accepts non-negative values with at most [`MAX_SCALE`] decimal places
    /// and [`MAX_DIGITS`] significant digits.
    pub fn new(value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(ParcelError::ValidationError(
                "Amount must not be negative".to_string(),
            ));
        }
        let normalized = value.normalize();
        if normalized.scale() > MAX_SCALE {
            return Err(ParcelError::ValidationError(format!(
                "Amount must have at most {MAX_SCALE} decimal places"
            )));
        }
        if normalized.mantissa() >= 10_i128.pow(MAX_DIGITS) {
            return Err(ParcelError::ValidationError(format!(
                "Amount must have at most {MAX_DIGITS} significant digits"
            )));
        }
        Ok(Self(value))
    }

    /// Parses operator input such as `150.5`, ` 42 ` or `1e3`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let value = Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| ParcelError::ValidationError(format!("Not a number: {raw:?}")))?;
        Self::new(value.normalize())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ParcelError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The operator who submitted a package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Submitter {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Submitter {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// A fully confirmed package waiting to be committed.
///
/// The ledger turns it into a [`PackageRecord`] by stamping the commit time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPackage {
    pub identifier: Identifier,
    pub disposition: Disposition,
    pub amount: Amount,
    pub submitter: Submitter,
}

impl NewPackage {
    /// Builds a package, forcing the amount to zero for anything but a payment.
    pub fn new(
        identifier: Identifier,
        disposition: Disposition,
        amount: Option<Amount>,
        submitter: Submitter,
    ) -> Self {
        let amount = match disposition {
            Disposition::Payment => amount.unwrap_or(Amount::ZERO),
            Disposition::Delivered | Disposition::Returned => Amount::ZERO,
        };
        Self {
            identifier,
            disposition,
            amount,
            submitter,
        }
    }

    pub fn into_record(self, committed_at: DateTime<Utc>) -> PackageRecord {
        PackageRecord {
            identifier: self.identifier,
            disposition: self.disposition,
            amount: self.amount,
            submitter: self.submitter,
            committed_at,
        }
    }
}

/// A committed, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub identifier: Identifier,
    pub disposition: Disposition,
    pub amount: Amount,
    pub submitter: Submitter,
    pub committed_at: DateTime<Utc>,
}
