//! Shared error taxonomy for the polytx crates
//!
//! Module-level error enums in the workspace embed [`CommonError`] for the
//! failures every module can hit (bad settings, rejected input, broken
//! internal state):
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum ScopeError {
//!     #[error("participant {0} refused to begin")]
//!     Begin(usize),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_classification!(ScopeError, Common,
//!     Self::Begin(_) => {
//!         retryable: false,
//!         severity: ErrorSeverity::Error,
//!         critical: false,
//!     }
//! );
//! ```
//!
//! ## Classification
//!
//! [`ErrorClassification`] answers the questions the retry engine and the
//! transaction scope ask about a failure:
//!
//! | Method | Meaning |
//! |--------|---------|
//! | `is_retryable()` | may the same call succeed if repeated unchanged |
//! | `severity()` | logging / alerting level |
//! | `is_critical()` | data integrity may be at risk |
//! | `retry_after()` | server-suggested delay, if any |
//!
//! Driver-level transient detection does not go through this trait: it is
//! decided by the per-engine allow-lists in `polytx-core`, which look at driver
//! error codes rather than at error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

/// Failures shared by every polytx module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// Invalid or missing settings; `field` names the offending key
    #[error("{}", config_message(.field.as_deref(), .message))]
    Config { message: String, field: Option<String> },

    /// Input rejected by a parser or validator
    #[error("{}", validation_message(.field, .message, .value.as_deref()))]
    Validation { field: String, message: String, value: Option<String> },

    /// Broken invariant inside polytx itself
    #[error("internal error: {message}")]
    Internal { message: String },
}

fn config_message(field: Option<&str>, message: &str) -> String {
    match field {
        Some(field) => format!("configuration error in '{field}': {message}"),
        None => format!("configuration error: {message}"),
    }
}

fn validation_message(field: &str, message: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("invalid {field} '{value}': {message}"),
        None => format!("invalid {field}: {message}"),
    }
}

impl CommonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    pub fn config_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: None }
    }

    /// Validation failure echoing the rejected input
    pub fn validation_with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation { field: field.into(), message: message.into(), value: Some(value.into()) }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

/// Questions the retry engine and the transaction scope ask about a failure
pub trait ErrorClassification {
    /// Whether repeating the same call unchanged may succeed
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Whether data integrity may be at risk
    fn is_critical(&self) -> bool;

    /// Suggested delay before a retry, when the failure carries one
    fn retry_after(&self) -> Option<Duration>;
}

/// None of the shared failures go away by repeating the call
impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } | Self::Validation { .. } => ErrorSeverity::Error,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Log level a failure is reported at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    /// Data may be inconsistent across participants
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Implement [`ErrorClassification`] for an enum that embeds `CommonError`,
/// delegating the common variant and listing the rest explicitly.
///
/// ```rust,ignore
/// impl_error_classification!(ScopeError, Common,
///     Self::Begin(_) => {
///         retryable: false,
///         severity: ErrorSeverity::Error,
///         critical: false,
///     }
/// );
/// ```
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr,
                critical: $critical:expr
                $(, retry_after: $retry_after:expr)?
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(e) => e.is_retryable(),
                    $(
                        $variant => $retryable,
                    )*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(e) => e.severity(),
                    $(
                        $variant => $severity,
                    )*
                }
            }

            fn is_critical(&self) -> bool {
                match self {
                    Self::$common_variant(e) => e.is_critical(),
                    $(
                        $variant => $critical,
                    )*
                }
            }

            fn retry_after(&self) -> Option<std::time::Duration> {
                match self {
                    Self::$common_variant(e) => e.retry_after(),
                    $(
                        $(
                            $variant => $retry_after,
                        )?
                    )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}
