use crate::domain::identifier::Identifier;
use crate::domain::package::{Amount, Disposition, MAX_SCALE, NewPackage, PackageRecord, Submitter};
use crate::domain::ports::Ledger;
use crate::error::{ParcelError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Format of the `timestamp` column, matching SQLite's `CURRENT_TIMESTAMP`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS packages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        barcode TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL,
        payment REAL DEFAULT 0,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
        user_id INTEGER,
        username TEXT,
        first_name TEXT,
        last_name TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_packages_timestamp
    ON packages(timestamp);
";

/// A durable ledger backed by a single SQLite `packages` table.
///
/// Uniqueness is enforced by the `UNIQUE` constraint on `barcode`, so a commit
/// is one `INSERT` and cannot race with another commit of the same barcode.
/// Queries run on the blocking pool; `Clone` shares the connection.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Opens or creates the database at `path` and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| ParcelError::storage("SQLite connection lock poisoned"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| ParcelError::StorageFailure(Box::new(e)))?
    }
}

/// A `packages` row before it is checked against the domain types.
struct StoredRow {
    barcode: String,
    status: String,
    payment: Option<f64>,
    timestamp: String,
    user_id: Option<i64>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            barcode: row.get(0)?,
            status: row.get(1)?,
            payment: row.get(2)?,
            timestamp: row.get(3)?,
            user_id: row.get(4)?,
            username: row.get(5)?,
            first_name: row.get(6)?,
            last_name: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<PackageRecord> {
        let disposition = Disposition::from_tag(&self.status).ok_or_else(|| {
            ParcelError::storage(format!(
                "Unknown status {:?} for barcode {}",
                self.status, self.barcode
            ))
        })?;
        let payment = self.payment.unwrap_or_default();
        // Amounts fit an f64 exactly up to MAX_SCALE places; drop the binary noise.
        let amount = Decimal::from_f64(payment)
            .map(|d| d.round_dp(MAX_SCALE).normalize())
            .ok_or_else(|| ParcelError::storage(format!("Invalid payment {payment}")))
            .and_then(Amount::new)?;
        let committed_at = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| ParcelError::storage(format!("Invalid timestamp: {e}")))?
            .and_utc();

        Ok(PackageRecord {
            identifier: Identifier::from_stored(self.barcode),
            disposition,
            amount,
            submitter: Submitter {
                id: self.user_id.unwrap_or_default(),
                username: self.username,
                first_name: self.first_name,
                last_name: self.last_name,
            },
            committed_at,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn exists(&self, identifier: &Identifier) -> Result<bool> {
        let barcode = identifier.as_str().to_string();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM packages WHERE barcode = ?1",
                    params![barcode],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn commit(&self, package: NewPackage) -> Result<PackageRecord> {
        self.with_conn(move |conn| {
            let committed_at: DateTime<Utc> = Utc::now().trunc_subsecs(0);
            let payment = package.amount.value().to_f64().ok_or_else(|| {
                ParcelError::ValidationError(format!("Amount {} out of range", package.amount))
            })?;

            let inserted = conn.execute(
                "INSERT INTO packages (barcode, status, payment, timestamp, user_id, username, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    package.identifier.as_str(),
                    package.disposition.tag(),
                    payment,
                    committed_at.format(TIMESTAMP_FORMAT).to_string(),
                    package.submitter.id,
                    package.submitter.username,
                    package.submitter.first_name,
                    package.submitter.last_name,
                ],
            );

            match inserted {
                Ok(_) => Ok(package.into_record(committed_at)),
                Err(e) if is_unique_violation(&e) => Err(ParcelError::DuplicateIdentifier(
                    package.identifier.to_string(),
                )),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn query_by_date(&self, day: NaiveDate) -> Result<Vec<PackageRecord>> {
        let day = day.format("%Y-%m-%d").to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT barcode, status, payment, timestamp, user_id, username, first_name, last_name
                 FROM packages
                 WHERE DATE(timestamp) = ?1
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![day], StoredRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(StoredRow::into_record).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn package(barcode: &str, disposition: Disposition, amount: Option<Decimal>) -> NewPackage {
        NewPackage::new(
            Identifier::parse(barcode).unwrap(),
            disposition,
            amount.map(|a| Amount::new(a).unwrap()),
            Submitter {
                id: 42,
                username: Some("courier".to_string()),
                first_name: Some("Olena".to_string()),
                last_name: None,
            },
        )
    }

    #[tokio::test]
    async fn test_sqlite_commit_and_exists() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let id = Identifier::parse("AB1234567").unwrap();
        assert!(!ledger.exists(&id).await.unwrap());

        ledger
            .commit(package("AB1234567", Disposition::Delivered, None))
            .await
            .unwrap();
        assert!(ledger.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_rejects_duplicate_without_overwrite() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger
            .commit(package("AB1234567", Disposition::Payment, Some(dec!(150.5))))
            .await
            .unwrap();

        let second = ledger
            .commit(package("AB1234567", Disposition::Returned, None))
            .await;
        assert!(matches!(second, Err(ParcelError::DuplicateIdentifier(_))));

        let rows = ledger.query_by_date(Utc::now().date_naive()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].disposition, Disposition::Payment);
        assert_eq!(rows[0].amount.value(), dec!(150.5));
    }

    #[tokio::test]
    async fn test_sqlite_round_trips_submitter() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let committed = ledger
            .commit(package("AB1234567", Disposition::Delivered, None))
            .await
            .unwrap();

        let rows = ledger
            .query_by_date(committed.committed_at.date_naive())
            .await
            .unwrap();
        assert_eq!(rows, vec![committed]);
        assert_eq!(rows[0].submitter.username.as_deref(), Some("courier"));
        assert_eq!(rows[0].amount, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_sqlite_round_trips_payment_amounts() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let amounts = [
            dec!(0.1),
            dec!(0.3),
            dec!(19.99),
            dec!(150.5),
            dec!(1234567.89),
            dec!(9999999999999.99),
        ];

        let mut committed = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let record = ledger
                .commit(package(
                    &format!("PAY{i:08}"),
                    Disposition::Payment,
                    Some(*amount),
                ))
                .await
                .unwrap();
            assert_eq!(record.amount.value(), *amount);
            committed.push(record);
        }

        let rows = ledger.query_by_date(Utc::now().date_naive()).await.unwrap();
        assert_eq!(rows, committed);
        for (row, amount) in rows.iter().zip(amounts) {
            assert_eq!(row.amount.to_string(), amount.normalize().to_string());
        }
    }

    #[tokio::test]
    async fn test_sqlite_schema_creation_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("packages.db");

        let first = SqliteLedger::open(&path).unwrap();
        first
            .commit(package("AB1234567", Disposition::Returned, None))
            .await
            .unwrap();
        drop(first);

        let reopened = SqliteLedger::open(&path).unwrap();
        let id = Identifier::parse("AB1234567").unwrap();
        assert!(reopened.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_query_by_date_filters_other_days() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        {
            let conn = ledger.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO packages (barcode, status, payment, timestamp, user_id)
                 VALUES ('OLD0000001', 'delivered', 0, '2020-01-01 10:00:00', 1)",
                [],
            )
            .unwrap();
        }
        ledger
            .commit(package("NEW0000001", Disposition::Delivered, None))
            .await
            .unwrap();

        let old = ledger
            .query_by_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].identifier.as_str(), "OLD0000001");

        let today = ledger.query_by_date(Utc::now().date_naive()).await.unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].identifier.as_str(), "NEW0000001");
    }
}
