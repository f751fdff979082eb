//! Error type of the suspending retry engine

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Outcome of a cancellable retry that did not produce a value
///
/// The blocking engine has no cancellation and returns the operation's error
/// directly; only the suspending engine wraps it.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The cancellation token fired before an attempt or during a backoff
    #[error("retry cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    /// Last error returned by the operation, unchanged
    #[error(transparent)]
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Cancelled { .. } => None,
        }
    }
}

impl<E: ErrorClassification> ErrorClassification for RetryError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled { .. } => false,
            Self::Operation(err) => err.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled { .. } => ErrorSeverity::Warning,
            Self::Operation(err) => err.severity(),
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Cancelled { .. } => false,
            Self::Operation(err) => err.is_critical(),
        }
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::Cancelled { .. } => None,
            Self::Operation(err) => err.retry_after(),
        }
    }
}
