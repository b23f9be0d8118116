use crate::domain::account::AccountId;
use crate::domain::transaction::Transaction;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Admitted transactions waiting for their account's worker.
///
/// The queue is a set of per-account FIFO slices behind one mutex. The lock is
/// only held for the map operation itself, never across an `.await`, so every
/// operation is linearizable and non-blocking for practical purposes.
#[derive(Default)]
pub struct PendingQueue {
    slices: Mutex<HashMap<AccountId, VecDeque<Transaction>>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `tx` to the tail of its account's slice. Never rejects.
    pub fn enqueue(&self, tx: Transaction) {
        self.slices
            .lock()
            .entry(tx.account.clone())
            .or_default()
            .push_back(tx);
    }

    /// Removes and returns the oldest pending transaction for `account`.
    pub fn dequeue_for(&self, account: &AccountId) -> Option<Transaction> {
        let mut slices = self.slices.lock();
        let slice = slices.get_mut(account)?;
        let tx = slice.pop_front();
        if slice.is_empty() {
            slices.remove(account);
        }
        tx
    }

    pub fn is_empty(&self, account: &AccountId) -> bool {
        !self.slices.lock().contains_key(account)
    }

    pub fn pending_for(&self, account: &AccountId) -> usize {
        self.slices.lock().get(account).map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.slices.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty_all(&self) -> bool {
        self.slices.lock().is_empty()
    }

    /// Empties the whole queue, returning what was pending.
    pub fn drain_all(&self) -> Vec<Transaction> {
        let mut slices = self.slices.lock();
        slices.drain().flat_map(|(_, slice)| slice).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionRequest;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn tx(account: &str, amount: i64) -> Transaction {
        Transaction::admit(TransactionRequest::new(
            account,
            "credit",
            Decimal::new(amount, 0),
        ))
        .unwrap()
    }

    #[test]
    fn test_enqueue_dequeue() {
        let queue = PendingQueue::new();
        let account = AccountId::from("acc-1");
        assert!(queue.is_empty(&account));

        let t1 = tx("acc-1", 100);
        queue.enqueue(t1.clone());
        assert!(!queue.is_empty(&account));

        let t2 = queue.dequeue_for(&account).unwrap();
        assert_eq!(t2.id, t1.id);
        assert!(queue.is_empty(&account));
    }

    #[test]
    fn test_dequeue_only_matching_account() {
        let queue = PendingQueue::new();
        let other = tx("acc-2", 5);
        let mine = tx("acc-1", 7);
        queue.enqueue(other.clone());
        queue.enqueue(mine.clone());

        let got = queue.dequeue_for(&AccountId::from("acc-1")).unwrap();
        assert_eq!(got.id, mine.id);
        assert!(queue.dequeue_for(&AccountId::from("acc-1")).is_none());
        assert_eq!(queue.pending_for(&AccountId::from("acc-2")), 1);
    }

    #[test]
    fn test_fifo_per_account() {
        let queue = PendingQueue::new();
        let txs: Vec<Transaction> = (1..=5).map(|i| tx("acc-1", i)).collect();
        for (i, t) in txs.iter().enumerate() {
            queue.enqueue(t.clone());
            queue.enqueue(tx(&format!("noise-{i}"), 1));
        }

        let account = AccountId::from("acc-1");
        for expected in &txs {
            assert_eq!(queue.dequeue_for(&account).unwrap().id, expected.id);
        }
    }

    #[test]
    fn test_empty_stays_empty_until_enqueue() {
        let queue = PendingQueue::new();
        let account = AccountId::from("acc-1");
        queue.enqueue(tx("acc-1", 1));
        queue.dequeue_for(&account).unwrap();

        for _ in 0..3 {
            assert!(queue.dequeue_for(&account).is_none());
            assert!(queue.is_empty(&account));
        }

        queue.enqueue(tx("acc-1", 2));
        assert!(queue.dequeue_for(&account).is_some());
    }

    #[test]
    fn test_drain_all() {
        let queue = PendingQueue::new();
        queue.enqueue(tx("acc-1", 1));
        queue.enqueue(tx("acc-2", 1));
        queue.enqueue(tx("acc-2", 2));
        assert_eq!(queue.len(), 3);

        let drained = queue.drain_all();
        assert_eq!(drained.len(), 3);
        assert!(queue.is_empty_all());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueue() {
        let queue = Arc::new(PendingQueue::new());
        let mut handles = Vec::new();
        for i in 0..10 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                queue.enqueue(tx("acc-1", i + 1));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let account = AccountId::from("acc-1");
        let mut count = 0;
        while queue.dequeue_for(&account).is_some() {
            count += 1;
        }
        assert_eq!(count, 10);
    }
}
