//! Retry bound to one engine's classifier

use std::fmt;
use std::future::Future;

use polytx_common::resilience::{RetryAttempt, RetryError, RetryExecutor, RetryOptions};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::classifier::CodeClassifier;
use super::fault::DriverFault;
use super::registry::ProviderEntry;
use super::ProviderKind;

/// Retry executor whose transient policy is a provider's allow-list
///
/// Retry telemetry carries the driver code of every retried failure.
#[derive(Debug, Clone)]
pub struct ProviderRetry {
    provider: ProviderKind,
    executor: RetryExecutor<&'static CodeClassifier>,
}

impl ProviderRetry {
    /// Use the built-in allow-list of `provider`
    pub fn new(provider: ProviderKind, options: RetryOptions) -> Self {
        Self { provider, executor: RetryExecutor::new(options, provider.classifier()) }
    }

    /// Use the classifier of a registry entry, which may be caller-supplied
    pub fn from_entry(entry: &ProviderEntry, options: RetryOptions) -> Self {
        Self { provider: entry.kind, executor: RetryExecutor::new(options, entry.classifier) }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn options(&self) -> &RetryOptions {
        self.executor.options()
    }

    pub fn classifier(&self) -> &'static CodeClassifier {
        *self.executor.policy()
    }

    /// Run `operation`, retrying failures the classifier deems transient
    ///
    /// A failure raised by a different engine is never retried, even when its
    /// code appears on this provider's list.
    pub fn run<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: DriverFault + fmt::Display,
    {
        self.run_observed(operation, |_| {})
    }

    pub fn run_observed<T, E, F, O>(&self, operation: F, on_retry: O) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        O: FnMut(&RetryAttempt<'_, E>),
        E: DriverFault + fmt::Display,
    {
        let _span = tracing::debug_span!("provider_retry", provider = %self.provider).entered();
        self.executor.run_observed(operation, on_retry)
    }

    /// Async [`run`](Self::run) that stops waiting once `cancel` fires
    pub async fn run_async<T, E, F, Fut>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: DriverFault + fmt::Display,
    {
        self.run_async_observed(operation, cancel, |_| {}).await
    }

    pub async fn run_async_observed<T, E, F, Fut, O>(
        &self,
        operation: F,
        cancel: &CancellationToken,
        on_retry: O,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        O: FnMut(&RetryAttempt<'_, E>),
        E: DriverFault + fmt::Display,
    {
        let span = tracing::debug_span!("provider_retry", provider = %self.provider);
        self.executor.run_async_observed(operation, cancel, on_retry).instrument(span).await
    }
}
