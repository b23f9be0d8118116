use ledger_engine::config::EngineConfig;
use ledger_engine::domain::account::{AccountId, Balance};
use ledger_engine::domain::ports::LedgerStore;
use ledger_engine::domain::transaction::{FailureReason, TransactionRequest};
use ledger_engine::infrastructure::fault_injection::{CommitFault, FaultInjectingStore};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

mod common;

fn faulty(config: EngineConfig) -> (
    ledger_engine::application::engine::LedgerEngine,
    FaultInjectingStore,
) {
    let store = common::store_with(&[("acc-1", dec!(1000))]);
    let faults = FaultInjectingStore::new(Arc::new(store));
    let engine = common::engine_over(Arc::new(faults.clone()), config);
    (engine, faults)
}

#[tokio::test]
async fn test_timed_out_submission_still_commits_once() {
    let (engine, faults) = faulty(EngineConfig {
        submit_timeout: Duration::from_millis(50),
        ..common::fast_config()
    });
    faults.set_commit_delay(Duration::from_millis(300));

    let result = engine
        .submit_and_wait(TransactionRequest::new("acc-1", "credit", dec!(100)))
        .await
        .unwrap();
    assert!(result.is_timed_out());

    // The worker keeps going after the submitter gave up.
    let account = AccountId::from("acc-1");
    let mut balance = faults.read_balance(&account).await.unwrap();
    for _ in 0..50 {
        if balance != Balance::new(dec!(1000)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        balance = faults.read_balance(&account).await.unwrap();
    }
    assert_eq!(balance, Balance::new(dec!(1100)));
    assert_eq!(faults.history(&account).await.unwrap().len(), 1);
    assert_eq!(faults.commit_calls(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_transient_commit_failure_is_retried() {
    let (engine, faults) = faulty(common::fast_config());
    faults.fail_commits([CommitFault::Fail, CommitFault::Fail]);

    let result = engine
        .submit_and_wait(TransactionRequest::new("acc-1", "debit", dec!(10)))
        .await
        .unwrap();

    assert_eq!(
        result.status().unwrap().balance(),
        Some(Balance::new(dec!(990)))
    );
    assert_eq!(faults.commit_calls(), 3);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_retries_exhausted_reports_store_unavailable() {
    let (engine, faults) = faulty(EngineConfig {
        max_attempts: 2,
        ..common::fast_config()
    });
    faults.fail_commits([CommitFault::Fail; 5]);

    let result = engine
        .submit_and_wait(TransactionRequest::new("acc-1", "credit", dec!(10)))
        .await
        .unwrap();

    assert_eq!(
        result.status().unwrap().failure_reason(),
        Some(FailureReason::StoreUnavailable)
    );
    assert_eq!(faults.commit_calls(), 2);
    assert_eq!(
        faults.read_balance(&AccountId::from("acc-1")).await.unwrap(),
        Balance::new(dec!(1000))
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_lost_acknowledgement_is_not_applied_twice() {
    let (engine, faults) = faulty(common::fast_config());
    faults.fail_commits([CommitFault::LoseAcknowledgement]);

    let result = engine
        .submit_and_wait(TransactionRequest::new("acc-1", "debit", dec!(600)))
        .await
        .unwrap();

    // A second application would have been refused for insufficient funds.
    assert_eq!(
        result.status().unwrap().balance(),
        Some(Balance::new(dec!(400)))
    );
    let account = AccountId::from("acc-1");
    assert_eq!(faults.history(&account).await.unwrap().len(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_read_failure_is_retried() {
    let (engine, faults) = faulty(common::fast_config());
    faults.fail_reads(1);

    let result = engine
        .submit_and_wait(TransactionRequest::new("acc-1", "credit", dec!(1)))
        .await
        .unwrap();

    assert!(result.status().unwrap().is_completed());
    engine.shutdown().await;
}

#[tokio::test]
async fn test_retry_keeps_later_work_flowing() {
    let (engine, faults) = faulty(common::fast_config());
    faults.fail_commits([CommitFault::Fail]);

    let first = engine
        .submit(TransactionRequest::new("acc-1", "credit", dec!(1)))
        .await
        .unwrap();
    let second = engine
        .submit(TransactionRequest::new("acc-1", "credit", dec!(2)))
        .await
        .unwrap();

    assert!(engine.await_outcome(first).await.status().unwrap().is_completed());
    assert!(engine.await_outcome(second).await.status().unwrap().is_completed());
    assert_eq!(
        faults.read_balance(&AccountId::from("acc-1")).await.unwrap(),
        Balance::new(dec!(1003))
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_resolves_queued_transactions() {
    let (engine, faults) = faulty(common::fast_config());
    faults.set_commit_delay(Duration::from_millis(200));

    let mut handles = Vec::new();
    for _ in 0..5 {
        handles.push(
            engine
                .submit(TransactionRequest::new("acc-1", "credit", dec!(1)))
                .await
                .unwrap(),
        );
    }
    engine.shutdown().await;

    let mut shut_down = 0;
    for handle in handles {
        let result = handle.wait(Duration::from_secs(1)).await;
        let status = result.status().expect("no waiter is left hanging");
        if status.failure_reason() == Some(FailureReason::ShutDown) {
            shut_down += 1;
        }
    }
    assert!(shut_down >= 1);
}
