use crate::domain::identifier::Identifier;
use crate::domain::package::{NewPackage, PackageRecord};
use crate::domain::ports::Ledger;
use crate::error::{ParcelError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for committed records, keyed by barcode.
pub const CF_PACKAGES: &str = "packages";
/// Column Family mapping a big-endian commit sequence number to a barcode.
pub const CF_COMMIT_LOG: &str = "commit_log";

/// A persistent ledger implementation using RocksDB.
///
/// Records live in `packages`; `commit_log` keeps commit order so date queries
/// return rows in the order they were written. Both are written in one batch.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and the
/// commit lock that makes check-then-insert atomic).
#[derive(Clone)]
pub struct RocksDBLedger {
    db: Arc<DB>,
    /// Next commit sequence number; the lock also serializes commits.
    next_seq: Arc<Mutex<u64>>,
}

impl RocksDBLedger {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the commit
    /// sequence after the last logged entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_packages = ColumnFamilyDescriptor::new(CF_PACKAGES, Options::default());
        let cf_commit_log = ColumnFamilyDescriptor::new(CF_COMMIT_LOG, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_packages, cf_commit_log])?;

        let next_seq = {
            let log = db
                .cf_handle(CF_COMMIT_LOG)
                .ok_or_else(|| ParcelError::storage("Commit log column family not found"))?;
            match db.iterator_cf(log, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_seq(&key)? + 1
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            next_seq: Arc::new(Mutex::new(next_seq)),
        })
    }

    fn read_record(&self, barcode: &[u8]) -> Result<Option<PackageRecord>> {
        let cf = self
            .db
            .cf_handle(CF_PACKAGES)
            .ok_or_else(|| ParcelError::storage("Packages column family not found"))?;

        match self.db.get_cf(&cf, barcode)? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| ParcelError::storage(format!("Deserialization error: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| ParcelError::storage("Malformed commit log key"))?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl Ledger for RocksDBLedger {
    async fn exists(&self, identifier: &Identifier) -> Result<bool> {
        let cf = self
            .db
            .cf_handle(CF_PACKAGES)
            .ok_or_else(|| ParcelError::storage("Packages column family not found"))?;

        // Just check if the key exists without retrieving the value
        let result = self.db.get_pinned_cf(&cf, identifier.as_str())?;
        Ok(result.is_some())
    }

    async fn commit(&self, package: NewPackage) -> Result<PackageRecord> {
        let packages = self
            .db
            .cf_handle(CF_PACKAGES)
            .ok_or_else(|| ParcelError::storage("Packages column family not found"))?;
        let log = self
            .db
            .cf_handle(CF_COMMIT_LOG)
            .ok_or_else(|| ParcelError::storage("Commit log column family not found"))?;

        let mut next_seq = self
            .next_seq
            .lock()
            .map_err(|_| ParcelError::storage("Commit lock poisoned"))?;

        let key = package.identifier.as_str().to_string();
        if self.db.get_pinned_cf(&packages, &key)?.is_some() {
            return Err(ParcelError::DuplicateIdentifier(key));
        }

        let record = package.into_record(Utc::now());
        let value = serde_json::to_vec(&record)
            .map_err(|e| ParcelError::storage(format!("Serialization error: {e}")))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&packages, &key, value);
        batch.put_cf(&log, next_seq.to_be_bytes(), &key);
        self.db.write(batch)?;
        *next_seq += 1;

        Ok(record)
    }

    async fn query_by_date(&self, day: NaiveDate) -> Result<Vec<PackageRecord>> {
        let log = self
            .db
            .cf_handle(CF_COMMIT_LOG)
            .ok_or_else(|| ParcelError::storage("Commit log column family not found"))?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(log, IteratorMode::Start) {
            let (_seq, barcode) = item?;
            if let Some(record) = self.read_record(&barcode)?
                && record.committed_at.date_naive() == day
            {
                records.push(record);
            }
        }

        Ok(records)
    }
}
