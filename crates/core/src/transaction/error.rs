use polytx_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use polytx_common::impl_error_classification;
use polytx_common::resilience::DriverCode;
use thiserror::Error;
use uuid::Uuid;

use super::participant::{ParticipantError, Phase};
use crate::providers::{DriverFault, ProviderKind};

/// A participant whose rollback failed
#[derive(Debug, Error)]
#[error("rollback of participant '{participant}' (#{index}) failed")]
pub struct RollbackFailure {
    pub participant: String,
    pub index: usize,
    #[source]
    pub source: ParticipantError,
}

#[derive(Debug, Error)]
pub enum TransactionError {
    /// Operation not allowed in the scope's current state
    #[error("cannot {operation}: {reason}")]
    State { operation: &'static str, reason: String },

    #[error("no active transaction for participant '{participant}' during {phase}")]
    NoActiveTransaction { participant: String, phase: Phase },

    #[error("failed to begin transaction for participant '{participant}'")]
    Begin {
        participant: String,
        #[source]
        source: ParticipantError,
    },

    #[error("participant '{participant}' could not enlist in ambient transaction {ambient}")]
    AmbientEnlist {
        participant: String,
        ambient: Uuid,
        #[source]
        source: ParticipantError,
    },

    /// Commit failed; earlier participants stay committed, this one and the
    /// later ones were rolled back
    #[error("commit failed for participant '{participant}' (#{index})")]
    Commit {
        participant: String,
        index: usize,
        #[source]
        source: ParticipantError,
    },

    #[error("rollback failed for {} participant(s)", .failures.len())]
    Rollback { failures: Vec<RollbackFailure> },

    #[error("{phase} cancelled at participant '{participant}' (#{index}), outcome unknown: {outcome_unknown}")]
    Cancelled { participant: String, index: usize, phase: Phase, outcome_unknown: bool },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransactionError {
    pub(crate) fn state(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::State { operation, reason: reason.into() }
    }

    /// Participant failure behind a begin, enlist or commit error
    pub fn participant_error(&self) -> Option<&ParticipantError> {
        match self {
            Self::Begin { source, .. }
            | Self::AmbientEnlist { source, .. }
            | Self::Commit { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Lets a whole unit of work be retried with a provider's classifier
impl DriverFault for TransactionError {
    fn driver_code(&self) -> Option<DriverCode> {
        self.participant_error().and_then(DriverFault::driver_code)
    }

    fn provider(&self) -> Option<ProviderKind> {
        self.participant_error().and_then(DriverFault::provider)
    }
}

impl_error_classification!(TransactionError, Common,
    Self::State { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::NoActiveTransaction { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Begin { .. } | Self::AmbientEnlist { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Commit { .. } => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: true,
    },
    Self::Rollback { .. } => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: false,
    },
    Self::Cancelled { .. } => {
        retryable: false,
        severity: ErrorSeverity::Warning,
        critical: false,
    }
);

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::providers::DriverError;

    #[test]
    fn test_commit_error_keeps_driver_error_in_chain() {
        let driver = DriverError::numeric(ProviderKind::MySql, 1213, "deadlock found");
        let err = TransactionError::Commit {
            participant: "orders".into(),
            index: 1,
            source: ParticipantError::driver(driver.clone()),
        };

        assert_eq!(err.to_string(), "commit failed for participant 'orders' (#1)");
        let participant = err.source().and_then(|e| e.downcast_ref::<ParticipantError>());
        assert!(participant.is_some());
        assert_eq!(err.participant_error().and_then(|e| e.downcast_ref::<DriverError>()), Some(&driver));
        assert!(err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.driver_code(), Some(DriverCode::Numeric(1213)));
        assert_eq!(err.provider(), Some(ProviderKind::MySql));
    }

    #[test]
    fn test_rollback_message_counts_failures() {
        let failure = RollbackFailure {
            participant: "a".into(),
            index: 0,
            source: ParticipantError::NoActiveTransaction(Phase::Rollback),
        };
        let err = TransactionError::Rollback { failures: vec![failure] };
        assert_eq!(err.to_string(), "rollback failed for 1 participant(s)");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancelled_and_common() {
        let err = TransactionError::Cancelled {
            participant: "b".into(),
            index: 2,
            phase: Phase::Commit,
            outcome_unknown: true,
        };
        assert!(err.is_cancelled());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(err.to_string().contains("outcome unknown: true"));

        let err: TransactionError = CommonError::internal("boom").into();
        assert!(err.is_critical());
        assert!(err.retry_after().is_none());
    }
}
