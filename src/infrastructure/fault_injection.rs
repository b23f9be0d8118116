//! A `LedgerStore` decorator that injects scripted faults.
//!
//! Used to exercise the worker's retry and timeout paths without a real
//! backend misbehaving.

use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ports::{LedgerStore, LedgerStoreRef};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What happens to one `commit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFault {
    /// The commit is refused and nothing is written.
    Fail,
    /// The commit is written but the caller is told it failed.
    LoseAcknowledgement,
    /// The commit call panics before touching the inner store.
    Panic,
}

#[derive(Clone)]
pub struct FaultInjectingStore {
    inner: LedgerStoreRef,
    commit_faults: Arc<Mutex<VecDeque<CommitFault>>>,
    read_failures: Arc<AtomicUsize>,
    commit_delay: Arc<Mutex<Duration>>,
    commit_calls: Arc<AtomicUsize>,
}

impl FaultInjectingStore {
    pub fn new(inner: LedgerStoreRef) -> Self {
        Self {
            inner,
            commit_faults: Arc::new(Mutex::new(VecDeque::new())),
            read_failures: Arc::new(AtomicUsize::new(0)),
            commit_delay: Arc::new(Mutex::new(Duration::ZERO)),
            commit_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues faults for the next commits, in order.
    pub fn fail_commits(&self, faults: impl IntoIterator<Item = CommitFault>) {
        self.commit_faults.lock().extend(faults);
    }

    /// The next `count` balance reads return an I/O error.
    pub fn fail_reads(&self, count: usize) {
        self.read_failures.store(count, Ordering::SeqCst);
    }

    /// Every commit sleeps this long before touching the inner store.
    pub fn set_commit_delay(&self, delay: Duration) {
        *self.commit_delay.lock() = delay;
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    fn injected() -> LedgerError {
        LedgerError::IoError(std::io::Error::other("injected store fault"))
    }
}

#[async_trait]
impl LedgerStore for FaultInjectingStore {
    async fn read_balance(&self, account: &AccountId) -> Result<Balance> {
        let failing = self
            .read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Self::injected());
        }
        self.inner.read_balance(account).await
    }

    async fn commit(
        &self,
        account: &AccountId,
        new_balance: Balance,
        record: &Transaction,
    ) -> Result<()> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.commit_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let fault = self.commit_faults.lock().pop_front();
        match fault {
            Some(CommitFault::Fail) => Err(Self::injected()),
            Some(CommitFault::Panic) => panic!("injected store panic"),
            Some(CommitFault::LoseAcknowledgement) => {
                self.inner.commit(account, new_balance, record).await?;
                Err(Self::injected())
            }
            None => self.inner.commit(account, new_balance, record).await,
        }
    }

    async fn exists(&self, tx_id: &TransactionId) -> Result<bool> {
        self.inner.exists(tx_id).await
    }

    async fn open_account(&self, account: Account) -> Result<()> {
        self.inner.open_account(account).await
    }

    async fn account(&self, account: &AccountId) -> Result<Option<Account>> {
        self.inner.account(account).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.inner.accounts().await
    }

    async fn history(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        self.inner.history(account).await
    }
}
