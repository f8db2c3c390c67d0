use crate::domain::identifier::Identifier;
use crate::domain::package::{NewPackage, PackageRecord};
use crate::domain::ports::Ledger;
use crate::error::{ParcelError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Entries {
    seen: HashSet<Identifier>,
    /// Commit order.
    records: Vec<PackageRecord>,
}

/// A thread-safe in-memory ledger.
///
/// Uses `Arc<RwLock<..>>` so clones share the same entries. The uniqueness check
/// and the append happen under a single write lock. Ideal for tests or for a
/// throwaway run where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<Entries>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed record, in commit order.
    pub async fn records(&self) -> Vec<PackageRecord> {
        self.entries.read().await.records.clone()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn exists(&self, identifier: &Identifier) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries.seen.contains(identifier))
    }

    async fn commit(&self, package: NewPackage) -> Result<PackageRecord> {
        let mut entries = self.entries.write().await;
        if !entries.seen.insert(package.identifier.clone()) {
            return Err(ParcelError::DuplicateIdentifier(
                package.identifier.to_string(),
            ));
        }
        let record = package.into_record(Utc::now());
        entries.records.push(record.clone());
        Ok(record)
    }

    async fn query_by_date(&self, day: NaiveDate) -> Result<Vec<PackageRecord>> {
        let entries = self.entries.read().await;
        Ok(entries
            .records
            .iter()
            .filter(|r| r.committed_at.date_naive() == day)
            .cloned()
            .collect())
    }
}
