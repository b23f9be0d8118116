use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::LedgerStore;
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    records: Vec<Transaction>,
    recorded_ids: HashSet<TransactionId>,
}

/// A thread-safe in-memory ledger.
///
/// Accounts and the transaction log live behind one `RwLock`, so a commit
/// updates the balance and appends the record under a single write guard.
/// Ideal for testing or for runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-populated with `accounts`.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let state = LedgerState {
            accounts: accounts
                .into_iter()
                .map(|account| (account.id.clone(), account))
                .collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn read_balance(&self, account: &AccountId) -> Result<Balance> {
        let state = self.state.read().await;
        state
            .accounts
            .get(account)
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))
    }

    async fn commit(
        &self,
        account: &AccountId,
        new_balance: Balance,
        record: &Transaction,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.recorded_ids.contains(&record.id) {
            return Err(LedgerError::DuplicateTransaction(record.id));
        }
        let entry = state
            .accounts
            .get_mut(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        entry.balance = new_balance;
        state.recorded_ids.insert(record.id);
        state.records.push(record.clone());
        Ok(())
    }

    async fn exists(&self, tx_id: &TransactionId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.recorded_ids.contains(tx_id))
    }

    async fn open_account(&self, account: Account) -> Result<()> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(LedgerError::DuplicateAccount(account.id));
        }
        state.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn account(&self, account: &AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(account).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn history(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .filter(|tx| &tx.account == account)
            .cloned()
            .collect())
    }
}
