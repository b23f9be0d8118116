use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("ledger-engine"));
    cmd.arg("tests/fixtures/transactions.csv")
        .arg("--accounts")
        .arg("tests/fixtures/accounts.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("account,name,balance"))
        .stdout(predicate::str::contains("acc-1,Test Customer,1050"))
        .stdout(predicate::str::contains("acc-2,Second Customer,10.5"));

    Ok(())
}

#[test]
fn test_cli_reports_and_skips_malformed_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("ledger-engine"));
    cmd.arg("tests/fixtures/malformed.csv")
        .arg("--accounts")
        .arg("tests/fixtures/accounts.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("acc-1,Test Customer,1101"))
        .stdout(predicate::str::contains("acc-2,Second Customer,10"))
        .stdout(predicate::str::contains("ghost").not())
        .stderr(predicate::str::contains("Error reading transaction"))
        .stderr(predicate::str::contains("Error submitting transaction"))
        .stderr(predicate::str::contains("Account not found: ghost"));

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!("ledger-engine"));
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_cli_rejects_zero_attempts() {
    let mut cmd = Command::new(cargo_bin!("ledger-engine"));
    cmd.arg("tests/fixtures/transactions.csv")
        .arg("--max-attempts")
        .arg("0");

    cmd.assert().failure();
}

#[test]
fn test_cli_without_accounts_prints_header_only() {
    let mut cmd = Command::new(cargo_bin!("ledger-engine"));
    cmd.arg("tests/fixtures/transactions.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::diff("account,name,balance\n"))
        .stderr(predicate::str::contains("Account not found: acc-1"));
}
