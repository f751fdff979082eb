//! Retry options and the injectable sleep primitive
//!
//! Options are immutable once built; the process-wide defaults are ordinary
//! values ([`RetryOptions::default`]) threaded through call sites rather than
//! global state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use super::backoff::{self, Jitter};
use super::constants::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, MAX_MAX_ATTEMPTS,
    MIN_MAX_ATTEMPTS,
};
use crate::error::{CommonError, CommonResult};

/// Sleep primitive used between attempts
///
/// The blocking engine calls [`Sleeper::sleep`]; the suspending engine awaits
/// [`Sleeper::sleep_async`]. Tests swap in
/// [`RecordingSleeper`](crate::testing::RecordingSleeper) to observe delays
/// without waiting for them.
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Block the current thread for `delay`
    fn sleep(&self, delay: Duration);

    /// Suspend the current task for `delay`
    fn sleep_async(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// Real clock: `std::thread::sleep` and `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    fn sleep(&self, delay: Duration) {
        // WARNING: Blocking sleep - the blocking engine must not run on an async runtime thread
        std::thread::sleep(delay);
    }

    fn sleep_async(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// Options for one retry invocation
#[derive(Debug, Clone)]
pub struct RetryOptions {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: Jitter::default(),
            sleeper: Arc::new(SystemSleeper),
        }
    }
}

impl RetryOptions {
    /// Validated options with default jitter and the system sleeper
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> CommonResult<Self> {
        Self::builder().max_attempts(max_attempts).base_delay(base_delay).max_delay(max_delay).build()
    }

    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::new()
    }

    /// Total attempts allowed, the first call included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter(&self) -> &Jitter {
        &self.jitter
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Backoff delay after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff::delay(attempt, self)
    }

    /// Copy of these options with a different sleeper
    pub fn with_sleeper(&self, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { sleeper, ..self.clone() }
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> CommonResult<()> {
        if !(MIN_MAX_ATTEMPTS..=MAX_MAX_ATTEMPTS).contains(&self.max_attempts) {
            return Err(CommonError::config_field(
                "max_attempts",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_MAX_ATTEMPTS, MAX_MAX_ATTEMPTS, self.max_attempts
                ),
            ));
        }

        if self.base_delay > self.max_delay {
            return Err(CommonError::config_field(
                "base_delay",
                format!(
                    "base_delay ({:?}) cannot be greater than max_delay ({:?})",
                    self.base_delay, self.max_delay
                ),
            ));
        }

        Ok(())
    }
}

/// Builder for RetryOptions with fluent API
#[derive(Debug)]
pub struct RetryOptionsBuilder {
    options: RetryOptions,
}

impl Default for RetryOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryOptionsBuilder {
    pub fn new() -> Self {
        Self { options: RetryOptions::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.options.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.options.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.options.max_delay = delay;
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.options.jitter = jitter;
        self
    }

    /// Force a zero jitter factor for exact delays
    pub fn no_jitter(self) -> Self {
        self.jitter(Jitter::None)
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.options.sleeper = sleeper;
        self
    }

    pub fn build(self) -> CommonResult<RetryOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
