use crate::domain::account::{Account, AccountId, Balance};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct AccountRecord {
    #[serde(alias = "id")]
    account: String,
    name: String,
    balance: Decimal,
}

/// Reads the accounts to seed a ledger with.
///
/// Expected header: `account, name, balance`.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<Account>> {
        self.reader.into_deserialize().map(|result| {
            let record: AccountRecord = result.map_err(LedgerError::from)?;
            Ok(Account::new(
                AccountId::new(record.account)?,
                record.name,
                Balance::new(record.balance),
            ))
        })
    }
}
