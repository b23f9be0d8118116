use super::account::{Account, AccountId, Balance};
use super::transaction::{Transaction, TransactionId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The persistent ledger the workers commit into.
///
/// `commit` must apply the balance update and the record append together or
/// not at all, and must refuse a record whose id is already stored.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current balance, or `LedgerError::AccountNotFound`.
    async fn read_balance(&self, account: &AccountId) -> Result<Balance>;
    async fn commit(
        &self,
        account: &AccountId,
        new_balance: Balance,
        record: &Transaction,
    ) -> Result<()>;
    /// Whether a record with this id has already been committed.
    async fn exists(&self, tx_id: &TransactionId) -> Result<bool>;
    async fn open_account(&self, account: Account) -> Result<()>;
    async fn account(&self, account: &AccountId) -> Result<Option<Account>>;
    async fn accounts(&self) -> Result<Vec<Account>>;
    async fn history(&self, account: &AccountId) -> Result<Vec<Transaction>>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
