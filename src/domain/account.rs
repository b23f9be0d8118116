use crate::domain::transaction::TransactionKind;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a customer account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Result<Self, LedgerError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LedgerError::ValidationError(
                "Account id is required".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signed monetary value.
///
/// This is a wrapper around `rust_decimal::Decimal` so balances cannot be
/// confused with raw transaction amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Computes the balance that results from applying `amount` as `kind`.
    ///
    /// A debit larger than the current balance is rejected. Credit has no
    /// business upper bound, only the range of `Decimal`.
    pub fn apply(self, kind: TransactionKind, amount: Decimal) -> Result<Self, LedgerError> {
        let next = match kind {
            TransactionKind::Credit => self.0.checked_add(amount),
            TransactionKind::Debit if self.0 >= amount => self.0.checked_sub(amount),
            TransactionKind::Debit => {
                return Err(LedgerError::InsufficientFunds {
                    balance: self,
                    requested: amount,
                });
            }
        };
        next.map(Self).ok_or(LedgerError::BalanceOverflow {
            balance: self,
            requested: amount,
        })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A customer account as held by the ledger store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    /// The unique identifier for the account.
    pub id: AccountId,
    /// Display name of the account holder.
    pub name: String,
    /// Current balance. Only ever changed by a worker's commit.
    pub balance: Balance,
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>, balance: Balance) -> Self {
        Self {
            id,
            name: name.into(),
            balance,
        }
    }
}
