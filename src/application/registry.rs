use crate::application::notifier::CompletionNotifier;
use crate::application::queue::PendingQueue;
use crate::application::worker::AccountWorker;
use crate::config::EngineConfig;
use crate::domain::account::AccountId;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct Workers {
    by_account: HashMap<AccountId, Arc<AccountWorker>>,
    closed: bool,
}

/// Owns one `AccountWorker` per active account.
///
/// Admission and retirement run under the same mutex, so a worker is never
/// retired while a concurrent admission is routing work to it.
pub struct WorkerRegistry {
    workers: Mutex<Workers>,
    queue: Arc<PendingQueue>,
    store: LedgerStoreRef,
    notifier: Arc<CompletionNotifier>,
    config: EngineConfig,
}

impl WorkerRegistry {
    pub fn new(
        queue: Arc<PendingQueue>,
        store: LedgerStoreRef,
        notifier: Arc<CompletionNotifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            workers: Mutex::new(Workers::default()),
            queue,
            store,
            notifier,
            config,
        }
    }

    /// Routes `tx` to its account's worker, starting one if needed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn admit(&self, tx: Transaction) -> Result<()> {
        let mut workers = self.workers.lock();
        if workers.closed {
            return Err(LedgerError::ShutDown);
        }
        let worker = workers
            .by_account
            .entry(tx.account.clone())
            .or_insert_with(|| {
                debug!(account = %tx.account, "starting account worker");
                let worker = AccountWorker::new(
                    tx.account.clone(),
                    Arc::clone(&self.queue),
                    Arc::clone(&self.store),
                    Arc::clone(&self.notifier),
                    self.config.clone(),
                );
                worker.start();
                worker
            });
        worker.begin_submission();
        self.queue.enqueue(tx);
        worker.wake();
        Ok(())
    }

    /// Stops and forgets every worker that has nothing left to do.
    ///
    /// Returns how many workers were retired.
    pub fn retire_idle(&self) -> usize {
        let mut workers = self.workers.lock();
        let idle: Vec<AccountId> = workers
            .by_account
            .iter()
            .filter(|(account, worker)| {
                worker.in_flight() == 0
                    && self.queue.is_empty(account)
                    && worker.idle_for() >= self.config.idle_timeout
            })
            .map(|(account, _)| account.clone())
            .collect();

        for account in &idle {
            if let Some(worker) = workers.by_account.remove(account) {
                debug!(%account, "retiring idle account worker");
                worker.stop();
            }
        }
        idle.len()
    }

    pub fn worker(&self, account: &AccountId) -> Option<Arc<AccountWorker>> {
        self.workers.lock().by_account.get(account).cloned()
    }

    pub fn len(&self) -> usize {
        self.workers.lock().by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.lock().by_account.is_empty()
    }

    /// Refuses further admissions and signals every worker to stop.
    ///
    /// Returns the stopped workers so the caller can wait for them.
    pub fn close(&self) -> Vec<Arc<AccountWorker>> {
        let mut workers = self.workers.lock();
        workers.closed = true;
        let stopped: Vec<Arc<AccountWorker>> =
            workers.by_account.drain().map(|(_, worker)| worker).collect();
        for worker in &stopped {
            worker.stop();
        }
        stopped
    }

    /// Closes the registry and waits for every worker loop to exit.
    pub async fn shutdown(&self) {
        for worker in self.close() {
            worker.join().await;
        }
    }
}
