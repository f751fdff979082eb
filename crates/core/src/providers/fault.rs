//! Driver error codes
//!
//! [`DriverFault`] is what a classifier needs from an error: the native code
//! the driver attached to it and the engine that raised it. Implemented for
//! the driver crates the workspace links and for [`DriverError`], a plain
//! carrier for engines reached through other means.

use polytx_common::resilience::DriverCode;
use thiserror::Error;

use super::ProviderKind;

/// Exposes the native error code carried by a driver failure
pub trait DriverFault {
    /// `None` when the failure carries no code (I/O, protocol, usage errors)
    fn driver_code(&self) -> Option<DriverCode>;

    /// Engine that raised the failure, when known
    ///
    /// Codes are only meaningful to the engine that issued them: SQLite's
    /// `SQLITE_MISMATCH` (20) and Oracle's `ORA-00020` share a number. A
    /// classifier treats a code from another engine as permanent. `None`
    /// means the origin is unknown and the code is taken at face value.
    fn provider(&self) -> Option<ProviderKind> {
        None
    }
}

impl<T: DriverFault + ?Sized> DriverFault for &T {
    fn driver_code(&self) -> Option<DriverCode> {
        (**self).driver_code()
    }

    fn provider(&self) -> Option<ProviderKind> {
        (**self).provider()
    }
}

impl<T: DriverFault + ?Sized> DriverFault for Box<T> {
    fn driver_code(&self) -> Option<DriverCode> {
        (**self).driver_code()
    }

    fn provider(&self) -> Option<ProviderKind> {
        (**self).provider()
    }
}

/// Coded failure reported by a database engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} error {code}: {message}")]
pub struct DriverError {
    pub provider: ProviderKind,
    pub code: DriverCode,
    pub message: String,
}

impl DriverError {
    pub fn numeric(provider: ProviderKind, code: i64, message: impl Into<String>) -> Self {
        Self { provider, code: DriverCode::Numeric(code), message: message.into() }
    }

    pub fn sqlstate(
        provider: ProviderKind,
        state: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { provider, code: DriverCode::SqlState(state.into()), message: message.into() }
    }
}

impl DriverFault for DriverError {
    fn driver_code(&self) -> Option<DriverCode> {
        Some(self.code.clone())
    }

    fn provider(&self) -> Option<ProviderKind> {
        Some(self.provider)
    }
}

/// SQLite reports extended result codes; the low byte is the primary code
/// (`SQLITE_BUSY_SNAPSHOT` 517 -> `SQLITE_BUSY` 5).
#[cfg(feature = "sqlite")]
impl DriverFault for rusqlite::Error {
    fn driver_code(&self) -> Option<DriverCode> {
        match self {
            rusqlite::Error::SqliteFailure(err, _) => {
                Some(DriverCode::Numeric(i64::from(err.extended_code & 0xff)))
            }
            _ => None,
        }
    }

    fn provider(&self) -> Option<ProviderKind> {
        Some(ProviderKind::Sqlite)
    }
}

#[cfg(feature = "postgres")]
impl DriverFault for tokio_postgres::Error {
    fn driver_code(&self) -> Option<DriverCode> {
        self.code().map(|state| DriverCode::SqlState(state.code().to_owned()))
    }

    fn provider(&self) -> Option<ProviderKind> {
        Some(ProviderKind::PostgreSql)
    }
}
