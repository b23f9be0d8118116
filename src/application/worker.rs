use crate::application::notifier::CompletionNotifier;
use crate::application::queue::PendingQueue;
use crate::config::EngineConfig;
use crate::domain::account::{AccountId, Balance};
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transaction::{FailureReason, Transaction, TransactionStatus};
use crate::error::{LedgerError, Result};
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Stopped,
}

/// Result of one execution attempt.
#[derive(Debug)]
pub enum Execution {
    Completed(Balance),
    Rejected(FailureReason),
    /// The store misbehaved; the attempt may succeed if repeated.
    Transient(LedgerError),
}

/// The single control loop allowed to mutate one account's balance.
///
/// A worker only ever dequeues its own account's transactions, so workers of
/// different accounts run in parallel while all commits for one account are
/// totally ordered.
pub struct AccountWorker {
    account: AccountId,
    queue: Arc<PendingQueue>,
    store: LedgerStoreRef,
    notifier: Arc<CompletionNotifier>,
    config: EngineConfig,
    state: Mutex<WorkerState>,
    stop_signal: watch::Sender<bool>,
    wake: Notify,
    in_flight: AtomicUsize,
    last_active: Mutex<Instant>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AccountWorker {
    pub fn new(
        account: AccountId,
        queue: Arc<PendingQueue>,
        store: LedgerStoreRef,
        notifier: Arc<CompletionNotifier>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let (stop_signal, _) = watch::channel(false);
        Arc::new(Self {
            account,
            queue,
            store,
            notifier,
            config,
            state: Mutex::new(WorkerState::Created),
            stop_signal,
            wake: Notify::new(),
            in_flight: AtomicUsize::new(0),
            last_active: Mutex::new(Instant::now()),
            task: Mutex::new(None),
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Launches the processing loop. No-op unless the worker is `Created`.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if *state != WorkerState::Created {
            return;
        }
        *state = WorkerState::Running;
        let worker = Arc::clone(self);
        *self.task.lock() = Some(tokio::spawn(worker.run()));
    }

    /// Asks the loop to exit at its next check. Idempotent.
    ///
    /// A transaction already being executed is finished, not rolled back.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == WorkerState::Stopped {
            return;
        }
        *state = WorkerState::Stopped;
        self.stop_signal.send_replace(true);
    }

    /// Waits for the processing loop to exit.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!(account = %self.account, "worker task failed: {}", e);
        }
    }

    /// Signals that new work may be available.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Records a submission routed to this worker that has not resolved yet.
    pub(crate) fn begin_submission(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    async fn run(self: Arc<Self>) {
        let mut stop = self.stop_signal.subscribe();
        debug!(account = %self.account, "worker started");

        loop {
            // `stop()` takes the same lock, so once it returns no further
            // transaction leaves the queue through this worker.
            let next = {
                let state = self.state.lock();
                if *state == WorkerState::Stopped {
                    break;
                }
                self.queue.dequeue_for(&self.account)
            };
            match next {
                Some(tx) => {
                    self.touch();
                    self.handle(tx).await;
                    self.touch();
                }
                None => {
                    tokio::select! {
                        _ = stop.changed() => {}
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
            }
        }

        debug!(account = %self.account, "worker stopped");
    }

    /// Executes `tx` and either emits its terminal status or re-queues it.
    ///
    /// Transient failures are re-queued silently until `max_attempts` is
    /// reached, so the submitter only ever sees one status per transaction.
    async fn handle(&self, mut tx: Transaction) {
        let execution = match AssertUnwindSafe(self.process(&tx)).catch_unwind().await {
            Ok(execution) => execution,
            Err(_) => {
                error!(account = %tx.account, transaction = %tx.id, "transaction execution panicked");
                Execution::Rejected(FailureReason::Internal)
            }
        };
        match execution {
            Execution::Completed(balance) => {
                info!(account = %tx.account, transaction = %tx.id, %balance, "transaction completed");
                self.emit(TransactionStatus::completed(&tx, balance));
            }
            Execution::Rejected(reason) => {
                info!(account = %tx.account, transaction = %tx.id, %reason, "transaction rejected");
                self.emit(TransactionStatus::failed(&tx, reason));
            }
            Execution::Transient(e) => {
                tx.attempts += 1;
                if tx.attempts >= self.config.max_attempts {
                    warn!(
                        account = %tx.account,
                        transaction = %tx.id,
                        attempt = tx.attempts,
                        "giving up after store failure: {}", e
                    );
                    self.emit(TransactionStatus::failed(&tx, FailureReason::StoreUnavailable));
                } else {
                    warn!(
                        account = %tx.account,
                        transaction = %tx.id,
                        attempt = tx.attempts,
                        "store failure, re-queueing: {}", e
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                    self.queue.enqueue(tx);
                }
            }
        }
    }

    /// One execution attempt against the store. Never retries by itself.
    pub async fn process(&self, tx: &Transaction) -> Execution {
        if tx.account != self.account || tx.validate().is_err() {
            return Execution::Rejected(FailureReason::InvalidTransaction);
        }

        let balance = match self.bounded(self.store.read_balance(&tx.account)).await {
            Ok(balance) => balance,
            Err(LedgerError::AccountNotFound(_)) => {
                return Execution::Rejected(FailureReason::AccountNotFound);
            }
            Err(e) => return self.classify(e),
        };

        // An earlier attempt may have committed without us hearing back.
        if tx.attempts > 0 {
            match self.bounded(self.store.exists(&tx.id)).await {
                Ok(true) => return Execution::Completed(balance),
                Ok(false) => {}
                Err(e) => return self.classify(e),
            }
        }

        let new_balance = match balance.apply(tx.kind, tx.amount) {
            Ok(new_balance) => new_balance,
            Err(LedgerError::InsufficientFunds { .. }) => {
                return Execution::Rejected(FailureReason::InsufficientFunds);
            }
            Err(LedgerError::BalanceOverflow { .. }) => {
                return Execution::Rejected(FailureReason::BalanceOverflow);
            }
            Err(_) => return Execution::Rejected(FailureReason::InvalidTransaction),
        };

        match self
            .bounded(self.store.commit(&tx.account, new_balance, tx))
            .await
        {
            Ok(()) => Execution::Completed(new_balance),
            Err(LedgerError::DuplicateTransaction(_)) => Execution::Completed(balance),
            Err(LedgerError::AccountNotFound(_)) => {
                Execution::Rejected(FailureReason::AccountNotFound)
            }
            Err(e) => self.classify(e),
        }
    }

    fn classify(&self, e: LedgerError) -> Execution {
        if e.is_transient() {
            Execution::Transient(e)
        } else {
            error!(account = %self.account, "unexpected store error: {}", e);
            Execution::Rejected(FailureReason::StoreUnavailable)
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.store_timeout, op)
            .await
            .unwrap_or(Err(LedgerError::StoreTimeout))
    }

    fn emit(&self, status: TransactionStatus) {
        // Settle the in-flight count first: a submitter that wakes up on the
        // status may immediately trigger retirement.
        let transaction = status.transaction_id;
        if self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            error!(account = %self.account, %transaction, "in-flight count underflow");
        }
        if !self.notifier.resolve(status) {
            debug!(account = %self.account, %transaction, "no submitter waiting for outcome");
        }
    }
}
