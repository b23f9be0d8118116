//! Engine tuning knobs.
//!
//! Defaults suit an interactive service. [`EngineConfig::from_env`] reads
//! `LEDGER_*` overrides (durations in milliseconds), loading `.env` first if
//! one is present.

use crate::error::{LedgerError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a submitter waits for its outcome.
    pub submit_timeout: Duration,
    /// Upper bound on how long an idle worker sleeps between queue checks.
    pub poll_interval: Duration,
    /// Execution attempts per transaction before a transient failure is final.
    pub max_attempts: u32,
    /// Pause before a transiently failed transaction is re-queued.
    pub retry_backoff: Duration,
    /// Bound on every individual store call.
    pub store_timeout: Duration,
    /// Idle time after which a worker with no pending work is retired.
    pub idle_timeout: Duration,
    /// How often the background reaper looks for idle workers.
    pub reap_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
            store_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            reap_interval: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Builds a config from the defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LEDGER_SUBMIT_TIMEOUT_MS`
    /// - `LEDGER_POLL_INTERVAL_MS`
    /// - `LEDGER_MAX_ATTEMPTS`
    /// - `LEDGER_RETRY_BACKOFF_MS`
    /// - `LEDGER_STORE_TIMEOUT_MS`
    /// - `LEDGER_IDLE_TIMEOUT_MS`
    /// - `LEDGER_REAP_INTERVAL_MS`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ConfigError` if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignores errors if file doesn't exist)
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            submit_timeout: millis_or("LEDGER_SUBMIT_TIMEOUT_MS", defaults.submit_timeout)?,
            poll_interval: millis_or("LEDGER_POLL_INTERVAL_MS", defaults.poll_interval)?,
            max_attempts: parsed_or("LEDGER_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_backoff: millis_or("LEDGER_RETRY_BACKOFF_MS", defaults.retry_backoff)?,
            store_timeout: millis_or("LEDGER_STORE_TIMEOUT_MS", defaults.store_timeout)?,
            idle_timeout: millis_or("LEDGER_IDLE_TIMEOUT_MS", defaults.idle_timeout)?,
            reap_interval: millis_or("LEDGER_REAP_INTERVAL_MS", defaults.reap_interval)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(LedgerError::ConfigError {
                key: "max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval.is_zero() || self.reap_interval.is_zero() {
            return Err(LedgerError::ConfigError {
                key: "poll_interval/reap_interval".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| LedgerError::ConfigError {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn millis_or(key: &str, default: Duration) -> Result<Duration> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parsed_or(key, default_ms).map(Duration::from_millis)
}
