//! Retry telemetry: the per-retry record handed to observers and the
//! structured `tracing` events the engine emits.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

/// Native error code reported by a database driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriverCode {
    /// Integer error number (SQL Server, MySQL, SQLite, Oracle)
    Numeric(i64),
    /// Five-character SQLSTATE (PostgreSQL)
    SqlState(String),
}

impl DriverCode {
    pub fn sqlstate(code: impl Into<String>) -> Self {
        Self::SqlState(code.into())
    }

    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            Self::Numeric(code) => Some(*code),
            Self::SqlState(_) => None,
        }
    }

    pub fn as_sqlstate(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::SqlState(state) => Some(state),
        }
    }
}

impl From<i64> for DriverCode {
    fn from(code: i64) -> Self {
        Self::Numeric(code)
    }
}

impl fmt::Display for DriverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(code) => write!(f, "{code}"),
            Self::SqlState(state) => f.write_str(state),
        }
    }
}

/// One scheduled retry, handed to `on_retry` before the backoff sleep
///
/// Never produced for an initial success or for the terminal failure.
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// 1-based number of the attempt that just failed
    pub attempt: u32,
    /// Delay about to be slept before the next attempt
    pub delay: Duration,
    pub error: &'a E,
    pub error_code: Option<DriverCode>,
}

/// Structured log events for one retry invocation
#[derive(Debug)]
pub(crate) struct RetryTrace {
    max_attempts: u32,
    total_delay: Duration,
}

impl RetryTrace {
    pub(crate) fn new(max_attempts: u32) -> Self {
        Self { max_attempts, total_delay: Duration::ZERO }
    }

    pub(crate) fn record_retry<E: fmt::Display>(&mut self, retry: &RetryAttempt<'_, E>) {
        self.total_delay = self.total_delay.saturating_add(retry.delay);
        debug!(
            attempt = retry.attempt,
            max_attempts = self.max_attempts,
            delay_ms = retry.delay.as_millis() as u64,
            error_code = retry.error_code.as_ref().map(tracing::field::display),
            error = %retry.error,
            "Transient failure, retrying"
        );
    }

    pub(crate) fn record_recovered(&self, attempts: u32) {
        if attempts > 1 {
            info!(
                attempts = attempts,
                total_delay_ms = self.total_delay.as_millis() as u64,
                "Operation recovered after retry"
            );
        }
    }

    pub(crate) fn record_exhausted<E: fmt::Display>(&self, error: &E, code: Option<&DriverCode>) {
        warn!(
            max_attempts = self.max_attempts,
            total_delay_ms = self.total_delay.as_millis() as u64,
            error_code = code.map(tracing::field::display),
            error = %error,
            "All retry attempts exhausted"
        );
    }

    pub(crate) fn record_permanent<E: fmt::Display>(
        &self,
        attempt: u32,
        error: &E,
        code: Option<&DriverCode>,
    ) {
        debug!(
            attempt = attempt,
            error_code = code.map(tracing::field::display),
            error = %error,
            "Permanent failure, not retrying"
        );
    }

    pub(crate) fn record_cancelled(&self, attempts: u32) {
        warn!(
            attempts = attempts,
            total_delay_ms = self.total_delay.as_millis() as u64,
            "Retry cancelled"
        );
    }

    #[cfg(test)]
    pub(crate) fn total_delay(&self) -> Duration {
        self.total_delay
    }
}
