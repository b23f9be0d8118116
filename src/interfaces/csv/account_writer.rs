use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes account balances as CSV (`account,name,balance`).
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = Account>) -> Result<()> {
        self.writer.write_record(["account", "name", "balance"])?;
        for account in accounts {
            self.writer.write_record([
                account.id.as_str(),
                account.name.as_str(),
                &account.balance.value().normalize().to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
