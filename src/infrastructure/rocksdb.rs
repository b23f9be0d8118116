use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::LedgerStore;
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing account states.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for storing committed transactions, keyed by transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family indexing committed transaction ids per account.
pub const CF_HISTORY: &str = "history";

/// A persistent ledger implementation using RocksDB.
///
/// A commit writes the new account state, the transaction record and its
/// history index entry in one `WriteBatch`, which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_TRANSACTIONS, CF_HISTORY]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn history_prefix(account: &AccountId) -> Vec<u8> {
        let mut key = account.as_str().as_bytes().to_vec();
        key.push(0);
        key
    }

    fn history_key(record: &Transaction) -> Vec<u8> {
        let mut key = Self::history_prefix(&record.account);
        let nanos = record.timestamp.timestamp_nanos_opt().unwrap_or_default();
        key.extend_from_slice(&nanos.to_be_bytes());
        key.extend_from_slice(record.id.as_bytes());
        key
    }

    /// Runs `op` on the blocking pool so RocksDB I/O never stalls a runtime
    /// thread and callers' timeouts can fire.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&DB) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| LedgerError::InternalError(Box::new(e)))?
    }
}

fn cf<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        LedgerError::InternalError(Box::new(std::io::Error::other(format!(
            "Column family '{name}' not found"
        ))))
    })
}

fn load_account(db: &DB, account: &AccountId) -> Result<Option<Account>> {
    match db.get_cf(cf(db, CF_ACCOUNTS)?, account.as_str().as_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn read_balance(&self, account: &AccountId) -> Result<Balance> {
        let account = account.clone();
        self.blocking(move |db| {
            load_account(db, &account)?
                .map(|a| a.balance)
                .ok_or(LedgerError::AccountNotFound(account))
        })
        .await
    }

    async fn commit(
        &self,
        account: &AccountId,
        new_balance: Balance,
        record: &Transaction,
    ) -> Result<()> {
        let account = account.clone();
        let record = record.clone();
        let history_key = Self::history_key(&record);
        self.blocking(move |db| {
            let transactions = cf(db, CF_TRANSACTIONS)?;
            if db.get_pinned_cf(transactions, record.id.as_bytes())?.is_some() {
                return Err(LedgerError::DuplicateTransaction(record.id));
            }

            let mut state = load_account(db, &account)?
                .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
            state.balance = new_balance;

            let mut batch = WriteBatch::default();
            batch.put_cf(
                cf(db, CF_ACCOUNTS)?,
                account.as_str().as_bytes(),
                encode(&state)?,
            );
            batch.put_cf(transactions, record.id.as_bytes(), encode(&record)?);
            batch.put_cf(cf(db, CF_HISTORY)?, history_key, record.id.as_bytes());
            db.write(batch)?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, tx_id: &TransactionId) -> Result<bool> {
        let tx_id = *tx_id;
        self.blocking(move |db| {
            let result = db.get_pinned_cf(cf(db, CF_TRANSACTIONS)?, tx_id.as_bytes())?;
            Ok(result.is_some())
        })
        .await
    }

    async fn open_account(&self, account: Account) -> Result<()> {
        self.blocking(move |db| {
            if load_account(db, &account.id)?.is_some() {
                return Err(LedgerError::DuplicateAccount(account.id));
            }
            db.put_cf(
                cf(db, CF_ACCOUNTS)?,
                account.id.as_str().as_bytes(),
                encode(&account)?,
            )?;
            Ok(())
        })
        .await
    }

    async fn account(&self, account: &AccountId) -> Result<Option<Account>> {
        let account = account.clone();
        self.blocking(move |db| load_account(db, &account)).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.blocking(|db| {
            let mut accounts = Vec::new();
            for item in db.iterator_cf(cf(db, CF_ACCOUNTS)?, IteratorMode::Start) {
                let (_key, value) = item?;
                accounts.push(decode(&value)?);
            }
            Ok(accounts)
        })
        .await
    }

    async fn history(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        let prefix = Self::history_prefix(account);
        self.blocking(move |db| {
            let history = cf(db, CF_HISTORY)?;
            let transactions = cf(db, CF_TRANSACTIONS)?;

            let mut records = Vec::new();
            let iter = db.iterator_cf(history, IteratorMode::From(&prefix, Direction::Forward));
            for item in iter {
                let (key, tx_id) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                if let Some(bytes) = db.get_cf(transactions, &tx_id)? {
                    records.push(decode(&bytes)?);
                }
            }
            Ok(records)
        })
        .await
    }
}
