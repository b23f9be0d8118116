use crate::domain::account::AccountId;
use crate::domain::transaction::{
    FailureReason, SubmissionResult, TransactionId, TransactionOutcome, TransactionStatus,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;

/// Correlation table routing each terminal status to the submitter that is
/// waiting for it, keyed by transaction id.
#[derive(Default)]
pub struct CompletionNotifier {
    slots: Mutex<HashMap<TransactionId, oneshot::Sender<TransactionStatus>>>,
}

impl CompletionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a single-use wait slot for `transaction_id`.
    ///
    /// Must be called before the transaction becomes visible to a worker.
    pub fn register(&self, transaction_id: TransactionId, account: AccountId) -> CompletionHandle {
        let (sender, receiver) = oneshot::channel();
        self.slots.lock().insert(transaction_id, sender);
        CompletionHandle {
            transaction_id,
            account,
            receiver,
        }
    }

    /// Delivers `status` to its slot, consuming the slot.
    ///
    /// Returns `false` if no slot was registered (already resolved) or the
    /// submitter stopped waiting.
    pub fn resolve(&self, status: TransactionStatus) -> bool {
        let slot = self.slots.lock().remove(&status.transaction_id);
        match slot {
            Some(sender) => sender.send(status).is_ok(),
            None => false,
        }
    }

    /// Drops a slot whose transaction never made it into the queue.
    pub fn discard(&self, transaction_id: &TransactionId) {
        self.slots.lock().remove(transaction_id);
    }

    /// Number of registered slots not yet resolved.
    pub fn pending(&self) -> usize {
        self.slots.lock().len()
    }
}

/// The submitter's side of a wait slot.
#[derive(Debug)]
pub struct CompletionHandle {
    transaction_id: TransactionId,
    account: AccountId,
    receiver: oneshot::Receiver<TransactionStatus>,
}

impl CompletionHandle {
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Waits up to `timeout` for the transaction's terminal status.
    ///
    /// Timing out does not cancel the transaction; its eventual status is
    /// dropped unread.
    pub async fn wait(self, timeout: Duration) -> SubmissionResult {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(status)) => SubmissionResult::Resolved(status),
            // The slot was dropped without a status; only happens when the
            // notifier itself is torn down.
            Ok(Err(_)) => SubmissionResult::Resolved(TransactionStatus {
                transaction_id: self.transaction_id,
                account: self.account,
                outcome: TransactionOutcome::Failed {
                    reason: FailureReason::ShutDown,
                },
            }),
            Err(_) => SubmissionResult::TimedOut {
                transaction_id: self.transaction_id,
            },
        }
    }
}
