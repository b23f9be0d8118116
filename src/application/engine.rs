use crate::application::notifier::{CompletionHandle, CompletionNotifier};
use crate::application::queue::PendingQueue;
use crate::application::registry::WorkerRegistry;
use crate::config::EngineConfig;
use crate::domain::account::Account;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transaction::{
    FailureReason, SubmissionResult, Transaction, TransactionRequest, TransactionStatus,
};
use crate::error::{LedgerError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The main entry point for submitting transactions.
///
/// `LedgerEngine` is built once at startup and owns everything the pipeline
/// shares: the store handle, the pending queue, the completion notifier and
/// the worker registry. Callers `submit` a request and await the returned
/// handle; execution happens on the account's worker.
pub struct LedgerEngine {
    store: LedgerStoreRef,
    queue: Arc<PendingQueue>,
    notifier: Arc<CompletionNotifier>,
    registry: Arc<WorkerRegistry>,
    config: EngineConfig,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` and starts its idle-worker reaper.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `store` - The ledger the workers commit into.
    /// * `config` - Timeouts, retry bound and polling intervals.
    pub fn new(store: LedgerStoreRef, config: EngineConfig) -> Self {
        let queue = Arc::new(PendingQueue::new());
        let notifier = Arc::new(CompletionNotifier::new());
        let registry = Arc::new(WorkerRegistry::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&notifier),
            config.clone(),
        ));
        let reaper = spawn_reaper(Arc::clone(&registry), &config);

        Self {
            store,
            queue,
            notifier,
            registry,
            config,
            reaper: Mutex::new(Some(reaper)),
        }
    }

    /// Admits a transaction and returns the handle its outcome arrives on.
    ///
    /// Malformed requests and unknown accounts are rejected here and never
    /// reach a worker.
    pub async fn submit(&self, request: TransactionRequest) -> Result<CompletionHandle> {
        let tx = Transaction::admit(request)?;

        let known = tokio::time::timeout(self.config.store_timeout, self.store.account(&tx.account))
            .await
            .unwrap_or(Err(LedgerError::StoreTimeout))?;
        if known.is_none() {
            return Err(LedgerError::AccountNotFound(tx.account));
        }

        let id = tx.id;
        let handle = self.notifier.register(id, tx.account.clone());
        debug!(account = %tx.account, transaction = %id, kind = %tx.kind, amount = %tx.amount, "transaction admitted");
        if let Err(e) = self.registry.admit(tx) {
            self.notifier.discard(&id);
            return Err(e);
        }
        Ok(handle)
    }

    /// Waits for `handle` using the configured submit timeout.
    pub async fn await_outcome(&self, handle: CompletionHandle) -> SubmissionResult {
        handle.wait(self.config.submit_timeout).await
    }

    /// Submits and waits in one step.
    pub async fn submit_and_wait(&self, request: TransactionRequest) -> Result<SubmissionResult> {
        let handle = self.submit(request).await?;
        Ok(self.await_outcome(handle).await)
    }

    pub fn store(&self) -> &LedgerStoreRef {
        &self.store
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of admitted transactions not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Final state of all accounts, as held by the store.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.accounts().await
    }

    /// Stops the reaper and every worker.
    ///
    /// Transactions still queued are resolved as failed so that no submitter
    /// is left waiting for its full timeout.
    pub async fn shutdown(&self) {
        if let Some(reaper) = self.reaper.lock().take() {
            reaper.abort();
        }
        self.registry.shutdown().await;

        let abandoned = self.queue.drain_all();
        let count = abandoned.len();
        for tx in abandoned {
            self.notifier
                .resolve(TransactionStatus::failed(&tx, FailureReason::ShutDown));
        }
        info!(abandoned = count, "ledger engine shut down");
    }
}

impl Drop for LedgerEngine {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.lock().take() {
            reaper.abort();
        }
        self.registry.close();
    }
}

fn spawn_reaper(registry: Arc<WorkerRegistry>, config: &EngineConfig) -> JoinHandle<()> {
    let period = config.reap_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let retired = registry.retire_idle();
            if retired > 0 {
                debug!(retired, "retired idle account workers");
            }
        }
    })
}
