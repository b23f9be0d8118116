use clap::Parser;
use ledger_engine::application::engine::LedgerEngine;
use ledger_engine::config::EngineConfig;
use ledger_engine::domain::ports::LedgerStoreRef;
use ledger_engine::domain::transaction::SubmissionResult;
use ledger_engine::error::LedgerError;
use ledger_engine::infrastructure::in_memory::InMemoryLedgerStore;
use ledger_engine::interfaces::csv::account_reader::AccountReader;
use ledger_engine::interfaces::csv::account_writer::AccountWriter;
use ledger_engine::interfaces::csv::transaction_reader::TransactionReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input transactions CSV file (`account,type,amount`)
    input: PathBuf,

    /// Accounts to open before processing (`id,name,balance`)
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// How long to wait for each transaction outcome, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Execution attempts per transaction before a store failure is final
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ledger_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env().into_diagnostic()?;
    if let Some(ms) = cli.timeout_ms {
        config.submit_timeout = Duration::from_millis(ms);
    }
    if let Some(attempts) = cli.max_attempts {
        config.max_attempts = attempts;
    }
    config.validate().into_diagnostic()?;

    let store = open_store(cli.db_path)?;

    if let Some(path) = cli.accounts {
        let file = File::open(path).into_diagnostic()?;
        for account in AccountReader::new(file).accounts() {
            match account {
                Ok(account) => match store.open_account(account).await {
                    // A persistent store keeps accounts from earlier runs.
                    Ok(()) | Err(LedgerError::DuplicateAccount(_)) => {}
                    Err(e) => return Err(e).into_diagnostic(),
                },
                Err(e) => eprintln!("Error reading account: {}", e),
            }
        }
    }

    let engine = LedgerEngine::new(store, config);

    let file = File::open(cli.input).into_diagnostic()?;
    let mut outcomes = JoinSet::new();
    for request in TransactionReader::new(file).requests() {
        match request {
            Ok(request) => match engine.submit(request).await {
                Ok(handle) => {
                    let timeout = engine.config().submit_timeout;
                    outcomes.spawn(handle.wait(timeout));
                }
                Err(e) => eprintln!("Error submitting transaction: {}", e),
            },
            Err(e) => eprintln!("Error reading transaction: {}", e),
        }
    }

    while let Some(joined) = outcomes.join_next().await {
        match joined.into_diagnostic()? {
            SubmissionResult::Resolved(status) => {
                tracing::info!(
                    account = %status.account,
                    transaction = %status.transaction_id,
                    outcome = ?status.outcome,
                    "transaction resolved"
                );
            }
            SubmissionResult::TimedOut { transaction_id } => {
                tracing::warn!(transaction = %transaction_id, "timed out waiting for outcome");
            }
        }
    }

    engine.shutdown().await;
    let accounts = engine.accounts().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    use ledger_engine::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryLedgerStore::new()))
}
