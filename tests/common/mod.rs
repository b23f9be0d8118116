#![allow(dead_code)]

use ledger_engine::application::engine::LedgerEngine;
use ledger_engine::config::EngineConfig;
use ledger_engine::domain::account::{Account, AccountId, Balance};
use ledger_engine::domain::ports::LedgerStoreRef;
use ledger_engine::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Short intervals so tests don't sit on default polling and backoff.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        submit_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
        retry_backoff: Duration::from_millis(5),
        store_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

pub fn store_with(accounts: &[(&str, Decimal)]) -> InMemoryLedgerStore {
    InMemoryLedgerStore::with_accounts(accounts.iter().map(|(id, balance)| {
        Account::new(AccountId::from(*id), *id, Balance::new(*balance))
    }))
}

pub fn engine_over(store: LedgerStoreRef, config: EngineConfig) -> LedgerEngine {
    LedgerEngine::new(store, config)
}

pub fn engine_with(accounts: &[(&str, Decimal)]) -> (LedgerEngine, InMemoryLedgerStore) {
    let store = store_with(accounts);
    let engine = LedgerEngine::new(Arc::new(store.clone()), fast_config());
    (engine, store)
}

pub fn write_accounts_csv(path: &Path, accounts: &[(&str, &str, &str)]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["id", "name", "balance"])?;
    for (id, name, balance) in accounts {
        wtr.write_record([id, name, balance])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `rows` credits of 1.0 spread round-robin over `accounts`.
pub fn generate_csv(path: &Path, accounts: &[&str], rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["account", "type", "amount"])?;
    for i in 0..rows {
        wtr.write_record([accounts[i % accounts.len()], "credit", "1.0"])?;
    }

    wtr.flush()?;
    Ok(())
}
