//! Retry engine
//!
//! Attempt 1 runs immediately. After a failure the policy decides: permanent
//! errors and the failure of the last allowed attempt are returned unchanged;
//! anything else is reported to `on_retry`, slept off, and retried. The
//! suspending variants additionally observe a [`CancellationToken`] before
//! every attempt and during every backoff delay.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::error::RetryError;
use super::options::RetryOptions;
use super::policy::TransientPolicy;
use super::telemetry::{RetryAttempt, RetryTrace};

/// Retry executor binding options to a transient policy
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    options: RetryOptions,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(options: RetryOptions, policy: P) -> Self {
        Self { options, policy }
    }

    /// Executor with default options
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryOptions::default(), policy)
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Run a blocking operation until it succeeds, fails permanently, or runs
    /// out of attempts
    pub fn run<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: TransientPolicy<E>,
        E: fmt::Display,
    {
        self.run_observed(operation, |_| {})
    }

    /// [`run`](Self::run), calling `on_retry` before each backoff sleep
    pub fn run_observed<T, E, F, O>(&self, mut operation: F, mut on_retry: O) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        O: FnMut(&RetryAttempt<'_, E>),
        P: TransientPolicy<E>,
        E: fmt::Display,
    {
        let max_attempts = self.options.max_attempts();
        let mut trace = RetryTrace::new(max_attempts);
        let mut attempt = 1;

        loop {
            let error = match operation() {
                Ok(value) => {
                    trace.record_recovered(attempt);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let error_code = self.policy.error_code(&error);
            if !self.policy.is_transient(&error) {
                trace.record_permanent(attempt, &error, error_code.as_ref());
                return Err(error);
            }
            if attempt >= max_attempts {
                trace.record_exhausted(&error, error_code.as_ref());
                return Err(error);
            }

            let delay = self.options.delay_for(attempt);
            let retry = RetryAttempt { attempt, delay, error: &error, error_code };
            trace.record_retry(&retry);
            on_retry(&retry);

            self.options.sleeper().sleep(delay);
            attempt += 1;
        }
    }

    /// Suspending counterpart of [`run`](Self::run)
    pub async fn run_async<T, E, F, Fut>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: TransientPolicy<E>,
        E: fmt::Display,
    {
        self.run_async_observed(operation, cancel, |_| {}).await
    }

    /// Suspending counterpart of [`run_observed`](Self::run_observed)
    ///
    /// Returns [`RetryError::Cancelled`] as soon as `cancel` fires, either
    /// before an attempt or while waiting out a backoff delay. An in-flight
    /// operation is never interrupted by the engine itself.
    pub async fn run_async_observed<T, E, F, Fut, O>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
        mut on_retry: O,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        O: FnMut(&RetryAttempt<'_, E>),
        P: TransientPolicy<E>,
        E: fmt::Display,
    {
        let max_attempts = self.options.max_attempts();
        let mut trace = RetryTrace::new(max_attempts);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                trace.record_cancelled(attempt - 1);
                return Err(RetryError::Cancelled { attempts: attempt - 1 });
            }

            let error = match operation().await {
                Ok(value) => {
                    trace.record_recovered(attempt);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let error_code = self.policy.error_code(&error);
            if !self.policy.is_transient(&error) {
                trace.record_permanent(attempt, &error, error_code.as_ref());
                return Err(RetryError::Operation(error));
            }
            if attempt >= max_attempts {
                trace.record_exhausted(&error, error_code.as_ref());
                return Err(RetryError::Operation(error));
            }

            let delay = self.options.delay_for(attempt);
            {
                let retry = RetryAttempt { attempt, delay, error: &error, error_code };
                trace.record_retry(&retry);
                on_retry(&retry);
            }
            drop(error);

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    trace.record_cancelled(attempt);
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                () = self.options.sleeper().sleep_async(delay) => {}
            }
            attempt += 1;
        }
    }
}

/// Run a blocking operation with a one-off executor
pub fn run<T, E, F, P>(options: &RetryOptions, policy: P, operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: TransientPolicy<E>,
    E: fmt::Display,
{
    RetryExecutor::new(options.clone(), policy).run(operation)
}

pub fn run_observed<T, E, F, O, P>(
    options: &RetryOptions,
    policy: P,
    operation: F,
    on_retry: O,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    O: FnMut(&RetryAttempt<'_, E>),
    P: TransientPolicy<E>,
    E: fmt::Display,
{
    RetryExecutor::new(options.clone(), policy).run_observed(operation, on_retry)
}

/// Run a suspending operation with a one-off executor
pub async fn run_async<T, E, F, Fut, P>(
    options: &RetryOptions,
    policy: P,
    operation: F,
    cancel: &CancellationToken,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: TransientPolicy<E>,
    E: fmt::Display,
{
    RetryExecutor::new(options.clone(), policy).run_async(operation, cancel).await
}

pub async fn run_async_observed<T, E, F, Fut, O, P>(
    options: &RetryOptions,
    policy: P,
    operation: F,
    cancel: &CancellationToken,
    on_retry: O,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(&RetryAttempt<'_, E>),
    P: TransientPolicy<E>,
    E: fmt::Display,
{
    RetryExecutor::new(options.clone(), policy).run_async_observed(operation, cancel, on_retry).await
}
