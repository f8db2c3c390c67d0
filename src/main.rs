use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use parcel_desk::application::engine::ConversationEngine;
use parcel_desk::application::sessions::SessionStore;
use parcel_desk::domain::ports::LedgerBox;
use parcel_desk::infrastructure::decoder::TextPayloadDecoder;
use parcel_desk::infrastructure::in_memory::InMemoryLedger;
use parcel_desk::infrastructure::sqlite::SqliteLedger;
use parcel_desk::interfaces::csv::event_reader::EventReader;
use parcel_desk::interfaces::csv::prompt_writer::PromptWriter;
use parcel_desk::interfaces::csv::record_writer::RecordWriter;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the ledger database
    #[arg(long, env = "PARCEL_DB_PATH", default_value = "packages.db", global = true)]
    db_path: PathBuf,

    /// Ledger storage backend
    #[arg(long, env = "PARCEL_BACKEND", value_enum, default_value_t = Backend::Sqlite, global = true)]
    backend: Backend,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Sqlite,
    Rocksdb,
    Memory,
}

#[derive(Subcommand)]
enum Command {
    /// Replay recorded gateway events from CSV and print the resulting prompts
    Replay {
        /// Events CSV file
        input: PathBuf,

        /// Drop sessions left untouched for this many seconds
        #[arg(long, env = "PARCEL_SESSION_IDLE_TIMEOUT_SECS")]
        session_idle_timeout_secs: Option<u64>,
    },
    /// Print the packages committed on a UTC day as CSV
    Daily {
        /// Day to export, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[cfg(feature = "storage-rocksdb")]
fn open_rocksdb(path: &Path) -> parcel_desk::error::Result<LedgerBox> {
    use parcel_desk::infrastructure::rocksdb::RocksDBLedger;
    Ok(Box::new(RocksDBLedger::open(path)?))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_rocksdb(path: &Path) -> parcel_desk::error::Result<LedgerBox> {
    warn!(
        "RocksDB storage requested via --backend, but 'storage-rocksdb' feature is not enabled. Falling back to SQLite storage."
    );
    Ok(Box::new(SqliteLedger::open(path)?))
}

fn open_ledger(backend: Backend, path: &Path) -> parcel_desk::error::Result<LedgerBox> {
    match backend {
        Backend::Sqlite => Ok(Box::new(SqliteLedger::open(path)?)),
        Backend::Rocksdb => open_rocksdb(path),
        Backend::Memory => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let ledger = open_ledger(cli.backend, &cli.db_path).into_diagnostic()?;

    match cli.command {
        Command::Replay {
            input,
            session_idle_timeout_secs,
        } => {
            let idle_timeout = session_idle_timeout_secs.map(Duration::from_secs);
            let sessions = Arc::new(SessionStore::new(idle_timeout));
            let _reaper = sessions.spawn_reaper(sessions.reap_interval());
            let engine = ConversationEngine::new(ledger, Box::new(TextPayloadDecoder), sessions);

            let file = File::open(input).into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = PromptWriter::new(stdout.lock());
            for event in EventReader::new(file).events() {
                match event {
                    Ok(event) => {
                        let prompts = engine.handle(event).await;
                        writer.write_prompts(&prompts).into_diagnostic()?;
                    }
                    Err(e) => {
                        warn!(error = %e, "Error reading event");
                    }
                }
            }
        }
        Command::Daily { date } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let records = ledger.query_by_date(day).await.into_diagnostic()?;
            info!(%day, count = records.len(), "exporting daily records");

            let stdout = io::stdout();
            let mut writer = RecordWriter::new(stdout.lock());
            writer.write_records(&records).into_diagnostic()?;
        }
    }

    Ok(())
}
