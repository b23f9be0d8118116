use assert_cmd::cargo_bin;
use predicates::prelude::*;
use assert_cmd::prelude::*;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_many_rows_across_accounts() {
    let dir = tempdir().unwrap();
    let accounts_path = dir.path().join("accounts.csv");
    let transactions_path = dir.path().join("transactions.csv");

    common::write_accounts_csv(
        &accounts_path,
        &[("a", "A", "0"), ("b", "B", "0"), ("c", "C", "0"), ("d", "D", "0")],
    )
    .expect("Failed to write accounts CSV");
    common::generate_csv(&transactions_path, &["a", "b", "c", "d"], 20_000)
        .expect("Failed to generate transactions CSV");

    Command::new(cargo_bin!("ledger-engine"))
        .arg(&transactions_path)
        .arg("--accounts")
        .arg(&accounts_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("a,A,5000"))
        .stdout(predicate::str::contains("d,D,5000"));
}
