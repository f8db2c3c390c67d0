use super::identifier::Identifier;
use super::package::{NewPackage, PackageRecord};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Durable, uniqueness-enforcing store of committed packages.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// True iff a record with this identifier was committed before.
    async fn exists(&self, identifier: &Identifier) -> Result<bool>;

    /// Inserts the package unless its identifier is already present.
    ///
    /// The presence check and the insert are one atomic step: of any number of
    /// concurrent commits for the same identifier exactly one succeeds, the rest
    /// get [`ParcelError::DuplicateIdentifier`](crate::error::ParcelError::DuplicateIdentifier).
    async fn commit(&self, package: NewPackage) -> Result<PackageRecord>;

    /// Records committed on the given UTC calendar day, in commit order.
    async fn query_by_date(&self, day: NaiveDate) -> Result<Vec<PackageRecord>>;
}

/// Extracts a barcode from image bytes.
#[async_trait]
pub trait BarcodeDecoder: Send + Sync {
    async fn decode(&self, image: &[u8]) -> Option<String>;
}

pub type LedgerBox = Box<dyn Ledger>;
pub type DecoderBox = Box<dyn BarcodeDecoder>;
