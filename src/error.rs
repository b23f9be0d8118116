use crate::domain::account::{AccountId, Balance};
use crate::domain::transaction::TransactionId;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("Account already exists: {0}")]
    DuplicateAccount(AccountId),
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Balance, requested: Decimal },
    #[error("Balance overflow: balance {balance}, requested {requested}")]
    BalanceOverflow { balance: Balance, requested: Decimal },
    #[error("Transaction already recorded: {0}")]
    DuplicateTransaction(TransactionId),
    #[error("Ledger engine is shut down")]
    ShutDown,
    #[error("Store operation timed out")]
    StoreTimeout,
    #[error("Invalid configuration for {key}: {message}")]
    ConfigError { key: String, message: String },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

impl LedgerError {
    /// Whether the failure may go away on a later attempt.
    ///
    /// Business and validation rejections are final; everything the store
    /// reports about itself (I/O, timeouts, backend errors) is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::StoreTimeout | LedgerError::IoError(_) | LedgerError::InternalError(_)
        ) || self.is_backend_error()
    }

    #[cfg(feature = "storage-rocksdb")]
    fn is_backend_error(&self) -> bool {
        matches!(self, LedgerError::RocksDbError(_))
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    fn is_backend_error(&self) -> bool {
        false
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
