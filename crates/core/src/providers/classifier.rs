//! Allow-list transient classifier

use polytx_common::resilience::{DriverCode, TransientPolicy};

use super::fault::DriverFault;
use super::ProviderKind;

/// Static allow-list of transient driver codes for one engine
///
/// A code on the list is transient. Anything else is permanent: a code off
/// the list, a failure with no code, or a code raised by a different engine
/// (engines reuse numbers for unrelated conditions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeClassifier {
    provider: ProviderKind,
    numeric: &'static [i64],
    sqlstates: &'static [&'static str],
}

impl CodeClassifier {
    pub const fn new(
        provider: ProviderKind,
        numeric: &'static [i64],
        sqlstates: &'static [&'static str],
    ) -> Self {
        Self { provider, numeric, sqlstates }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn numeric_codes(&self) -> &'static [i64] {
        self.numeric
    }

    pub fn sqlstates(&self) -> &'static [&'static str] {
        self.sqlstates
    }

    /// Whether `code` is on this engine's allow-list
    pub fn is_transient_code(&self, code: &DriverCode) -> bool {
        match code {
            DriverCode::Numeric(n) => self.numeric.contains(n),
            DriverCode::SqlState(state) => {
                self.sqlstates.iter().any(|known| known.eq_ignore_ascii_case(state))
            }
        }
    }
}

impl<E: DriverFault + ?Sized> TransientPolicy<E> for CodeClassifier {
    fn is_transient(&self, error: &E) -> bool {
        if error.provider().is_some_and(|origin| origin != self.provider) {
            return false;
        }
        error.driver_code().is_some_and(|code| self.is_transient_code(&code))
    }

    fn error_code(&self, error: &E) -> Option<DriverCode> {
        error.driver_code()
    }
}
