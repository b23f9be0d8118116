use crate::domain::account::{AccountId, Balance};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Globally unique transaction identity, assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            other => Err(LedgerError::ValidationError(format!(
                "Invalid transaction type '{other}'. Must be 'credit' or 'debit'"
            ))),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credit => f.write_str("credit"),
            TransactionKind::Debit => f.write_str("debit"),
        }
    }
}

/// The unvalidated shape of a transaction as it arrives from a caller.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransactionRequest {
    pub account: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Decimal,
}

impl TransactionRequest {
    pub fn new(account: impl Into<String>, kind: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            kind: kind.into(),
            amount,
        }
    }
}

/// An admitted credit or debit against one account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub account: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Failed execution attempts so far. Only meaningful while queued.
    #[serde(skip, default)]
    pub attempts: u32,
}

impl Transaction {
    /// Validates a request and stamps it with a fresh identity and timestamp.
    pub fn admit(request: TransactionRequest) -> Result<Self, LedgerError> {
        let account = AccountId::new(request.account)?;
        let kind = request.kind.parse()?;
        let tx = Self {
            id: TransactionId::generate(),
            account,
            kind,
            amount: request.amount,
            timestamp: Utc::now(),
            attempts: 0,
        };
        tx.validate()?;
        Ok(tx)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::ValidationError(
                "Amount must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a transaction did not complete.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidTransaction,
    InsufficientFunds,
    /// The new balance would not fit in a `Decimal`.
    BalanceOverflow,
    AccountNotFound,
    StoreUnavailable,
    ShutDown,
    /// Execution aborted unexpectedly; nothing was committed by this attempt.
    Internal,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::InvalidTransaction => "invalid transaction",
            FailureReason::InsufficientFunds => "insufficient funds",
            FailureReason::BalanceOverflow => "balance overflow",
            FailureReason::AccountNotFound => "account not found",
            FailureReason::StoreUnavailable => "store unavailable",
            FailureReason::ShutDown => "engine shut down",
            FailureReason::Internal => "internal error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransactionOutcome {
    Completed { balance: Balance },
    Failed { reason: FailureReason },
}

/// Terminal status of one transaction, routed back to its submitter.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct TransactionStatus {
    pub transaction_id: TransactionId,
    pub account: AccountId,
    #[serde(flatten)]
    pub outcome: TransactionOutcome,
}

impl TransactionStatus {
    pub fn completed(tx: &Transaction, balance: Balance) -> Self {
        Self {
            transaction_id: tx.id,
            account: tx.account.clone(),
            outcome: TransactionOutcome::Completed { balance },
        }
    }

    pub fn failed(tx: &Transaction, reason: FailureReason) -> Self {
        Self {
            transaction_id: tx.id,
            account: tx.account.clone(),
            outcome: TransactionOutcome::Failed { reason },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, TransactionOutcome::Completed { .. })
    }

    /// The resulting balance; only present for completed transactions.
    pub fn balance(&self) -> Option<Balance> {
        match self.outcome {
            TransactionOutcome::Completed { balance } => Some(balance),
            TransactionOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.outcome {
            TransactionOutcome::Completed { .. } => None,
            TransactionOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// What a submitter observes when it waits on its transaction.
#[derive(Debug, PartialEq, Clone)]
pub enum SubmissionResult {
    Resolved(TransactionStatus),
    TimedOut { transaction_id: TransactionId },
}

impl SubmissionResult {
    pub fn status(&self) -> Option<&TransactionStatus> {
        match self {
            SubmissionResult::Resolved(status) => Some(status),
            SubmissionResult::TimedOut { .. } => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, SubmissionResult::TimedOut { .. })
    }
}
