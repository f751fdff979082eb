//! Scope bookkeeping shared by the blocking and suspending scopes
//!
//! [`ScopeCore`] owns the participant records and the state machine; the two
//! scope types only add the calls into their participant traits.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ambient::AmbientTransaction;
use super::error::{RollbackFailure, TransactionError};
use super::isolation::IsolationLevel;
use super::participant::{ParticipantError, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
    pub isolation: IsolationLevel,
    /// Join an active ambient transaction instead of opening local ones
    pub prefer_ambient: bool,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self { isolation: IsolationLevel::ReadCommitted, prefer_ambient: true }
    }
}

impl ScopeOptions {
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_prefer_ambient(mut self, prefer_ambient: bool) -> Self {
        self.prefer_ambient = prefer_ambient;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Ambient,
    Local,
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient => write!(f, "ambient"),
            Self::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Open,
    Completed,
    Disposed,
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Completed => write!(f, "completed"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    Enlisted,
    Committed,
    RolledBack,
}

/// Read-only view of one participant record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub index: usize,
    pub name: String,
    pub isolation: IsolationLevel,
    pub state: ParticipantState,
    /// Whether the scope holds a local transaction handle for it
    pub has_transaction: bool,
}

pub(crate) struct Participant<T> {
    index: usize,
    name: String,
    isolation: IsolationLevel,
    state: ParticipantState,
    transaction: Option<T>,
}

/// How the next enlistment joins the scope
pub(crate) enum EnlistPlan {
    Ambient(AmbientTransaction),
    Local(IsolationLevel),
}

pub(crate) struct ScopeCore<T> {
    id: Uuid,
    options: ScopeOptions,
    mode: Option<ScopeMode>,
    ambient: Option<AmbientTransaction>,
    participants: Vec<Participant<T>>,
    state: ScopeState,
    complete_attempted: bool,
    disposing: bool,
}

impl<T> ScopeCore<T> {
    pub(crate) fn new(options: ScopeOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
            mode: None,
            ambient: None,
            participants: Vec::new(),
            state: ScopeState::Open,
            complete_attempted: false,
            disposing: false,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn options(&self) -> ScopeOptions {
        self.options
    }

    pub(crate) fn mode(&self) -> Option<ScopeMode> {
        self.mode
    }

    pub(crate) fn state(&self) -> ScopeState {
        self.state
    }

    pub(crate) fn ambient(&self) -> Option<&AmbientTransaction> {
        self.ambient.as_ref()
    }

    pub(crate) fn len(&self) -> usize {
        self.participants.len()
    }

    pub(crate) fn participants(&self) -> Vec<ParticipantInfo> {
        self.participants
            .iter()
            .map(|p| ParticipantInfo {
                index: p.index,
                name: p.name.clone(),
                isolation: p.isolation,
                state: p.state,
                has_transaction: p.transaction.is_some(),
            })
            .collect()
    }

    /// Decide how `participant` joins, resolving the mode on first use
    ///
    /// The mode itself is only fixed by the `record_*` calls, after the
    /// adapter call succeeded.
    pub(crate) fn plan(
        &self,
        participant: &str,
        ambient: Option<&AmbientTransaction>,
    ) -> Result<EnlistPlan, TransactionError> {
        match self.state {
            ScopeState::Open if self.disposing => {
                return Err(TransactionError::state("enlist", "scope is being disposed"));
            }
            ScopeState::Open if !self.complete_attempted => {}
            ScopeState::Open => {
                return Err(TransactionError::state("enlist", "scope has already been completed"));
            }
            state => {
                return Err(TransactionError::state("enlist", format!("scope is {state}")));
            }
        }

        match self.mode {
            Some(ScopeMode::Local) => Ok(EnlistPlan::Local(self.options.isolation)),
            Some(ScopeMode::Ambient) => match &self.ambient {
                Some(captured) if captured.is_active() => Ok(EnlistPlan::Ambient(captured.clone())),
                _ => Err(TransactionError::NoActiveTransaction {
                    participant: participant.to_owned(),
                    phase: Phase::Begin,
                }),
            },
            None => match ambient {
                Some(ambient) if self.options.prefer_ambient && ambient.is_active() => {
                    Ok(EnlistPlan::Ambient(ambient.clone()))
                }
                _ => Ok(EnlistPlan::Local(self.options.isolation)),
            },
        }
    }

    pub(crate) fn record_ambient(&mut self, name: &str, ambient: AmbientTransaction) -> usize {
        ambient.record_enlistment();
        let isolation = ambient.isolation();
        if self.mode.is_none() {
            tracing::debug!(scope = %self.id, ambient = %ambient.id(), mode = %ScopeMode::Ambient, "Scope mode resolved");
            self.mode = Some(ScopeMode::Ambient);
            self.ambient = Some(ambient);
        }
        self.push(name, isolation, None)
    }

    pub(crate) fn record_local(&mut self, name: &str, isolation: IsolationLevel, transaction: T) -> usize {
        if self.mode.is_none() {
            tracing::debug!(scope = %self.id, mode = %ScopeMode::Local, "Scope mode resolved");
            self.mode = Some(ScopeMode::Local);
        }
        self.push(name, isolation, Some(transaction))
    }

    fn push(&mut self, name: &str, isolation: IsolationLevel, transaction: Option<T>) -> usize {
        let index = self.participants.len();
        self.participants.push(Participant {
            index,
            name: name.to_owned(),
            isolation,
            state: ParticipantState::Enlisted,
            transaction,
        });
        tracing::debug!(scope = %self.id, participant = index, name, isolation = %isolation, "Participant enlisted");
        index
    }

    /// Gate for `complete`; returns whether there are local commits to run
    pub(crate) fn begin_complete(&mut self) -> Result<bool, TransactionError> {
        if self.state != ScopeState::Open {
            return Err(TransactionError::state("complete", format!("scope is {}", self.state)));
        }
        if self.disposing {
            return Err(TransactionError::state("complete", "scope is being disposed"));
        }
        if self.complete_attempted {
            return Err(TransactionError::state("complete", "complete may only be called once"));
        }
        self.complete_attempted = true;

        if self.mode == Some(ScopeMode::Local) {
            Ok(true)
        } else {
            self.mark_completed();
            Ok(false)
        }
    }

    pub(crate) fn mark_completed(&mut self) {
        self.state = ScopeState::Completed;
        tracing::info!(scope = %self.id, participants = self.participants.len(), "Scope completed");
    }

    /// Whether `dispose` still has to roll back local participants
    pub(crate) fn needs_rollback(&self) -> bool {
        self.mode == Some(ScopeMode::Local) && self.state == ScopeState::Open
    }

    /// Close the scope to enlist and complete while rollbacks are pending;
    /// an interrupted dispose leaves it Open so the next one can resume
    pub(crate) fn begin_dispose(&mut self) {
        self.disposing = true;
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state == ScopeState::Disposed
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.state = ScopeState::Disposed;
        tracing::debug!(scope = %self.id, "Scope disposed");
    }

    pub(crate) fn name(&self, index: usize) -> &str {
        self.participants.get(index).map_or("", |p| p.name.as_str())
    }

    pub(crate) fn transaction(&self, index: usize) -> Option<&T> {
        self.participants.get(index).and_then(|p| p.transaction.as_ref())
    }

    /// Indices from `start` on that still hold an uncommitted local transaction
    pub(crate) fn pending_from(&self, start: usize) -> Vec<usize> {
        self.participants
            .iter()
            .skip(start)
            .filter(|p| p.state == ParticipantState::Enlisted && p.transaction.is_some())
            .map(|p| p.index)
            .collect()
    }

    pub(crate) fn mark_committed(&mut self, index: usize) {
        if let Some(p) = self.participants.get_mut(index) {
            p.state = ParticipantState::Committed;
            tracing::debug!(scope = %self.id, participant = index, name = %p.name, "Participant committed");
        }
    }

    /// Record a rollback attempt; the participant counts as rolled back
    /// whether or not the driver call succeeded
    pub(crate) fn record_rollback(
        &mut self,
        index: usize,
        result: Result<(), ParticipantError>,
    ) -> Option<RollbackFailure> {
        let p = self.participants.get_mut(index)?;
        p.state = ParticipantState::RolledBack;
        match result {
            Ok(()) => {
                tracing::debug!(scope = %self.id, participant = index, name = %p.name, "Participant rolled back");
                None
            }
            Err(source) => {
                tracing::warn!(
                    scope = %self.id,
                    participant = index,
                    name = %p.name,
                    error = %source,
                    "Participant rollback failed"
                );
                Some(RollbackFailure { participant: p.name.clone(), index, source })
            }
        }
    }

    /// Take every remaining handle out of the records, for release
    pub(crate) fn take_transactions(&mut self) -> Vec<T> {
        self.participants.iter_mut().filter_map(|p| p.transaction.take()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_core() -> ScopeCore<u8> {
        let mut core = ScopeCore::new(ScopeOptions::default());
        core.record_local("a", IsolationLevel::ReadCommitted, 1);
        core.record_local("b", IsolationLevel::ReadCommitted, 2);
        core.record_local("c", IsolationLevel::ReadCommitted, 3);
        core
    }

    #[test]
    fn test_options_default() {
        let options = ScopeOptions::default();
        assert_eq!(options.isolation, IsolationLevel::ReadCommitted);
        assert!(options.prefer_ambient);
        let options = options.with_prefer_ambient(false).with_isolation(IsolationLevel::Serializable);
        assert!(!options.prefer_ambient);
        assert_eq!(options.isolation, IsolationLevel::Serializable);
    }

    /// Validates mode planning before the first enlistment.
    ///
    /// Assertions:
    /// - An active ambient is joined when preferred.
    /// - An inactive ambient or `prefer_ambient = false` falls back to local.
    /// - Planning alone does not fix the mode.
    #[test]
    fn test_plan_resolves_mode() {
        let ambient = AmbientTransaction::begin(IsolationLevel::Serializable);
        let core: ScopeCore<u8> = ScopeCore::new(ScopeOptions::default());
        assert!(matches!(core.plan("a", Some(&ambient)).unwrap(), EnlistPlan::Ambient(_)));
        assert!(matches!(core.plan("a", None).unwrap(), EnlistPlan::Local(IsolationLevel::ReadCommitted)));
        assert!(core.mode().is_none());

        let local_only: ScopeCore<u8> = ScopeCore::new(ScopeOptions::default().with_prefer_ambient(false));
        assert!(matches!(local_only.plan("a", Some(&ambient)).unwrap(), EnlistPlan::Local(_)));

        ambient.abort().unwrap();
        assert!(matches!(core.plan("a", Some(&ambient)).unwrap(), EnlistPlan::Local(_)));
    }

    #[test]
    fn test_local_mode_ignores_later_ambient() {
        let core = local_core();
        let ambient = AmbientTransaction::begin(IsolationLevel::ReadCommitted);
        assert!(matches!(core.plan("d", Some(&ambient)).unwrap(), EnlistPlan::Local(_)));
    }

    #[test]
    fn test_captured_ambient_must_stay_active() {
        let ambient = AmbientTransaction::begin(IsolationLevel::ReadCommitted);
        let mut core: ScopeCore<u8> = ScopeCore::new(ScopeOptions::default());
        core.record_ambient("a", ambient.clone());
        assert_eq!(ambient.enlistment_count(), 1);
        assert!(matches!(core.plan("b", None).unwrap(), EnlistPlan::Ambient(_)));

        ambient.complete().unwrap();
        let err = core.plan("b", None).err().unwrap();
        assert!(matches!(err, TransactionError::NoActiveTransaction { phase: Phase::Begin, .. }));
    }

    #[test]
    fn test_begin_complete_once() {
        let mut core = local_core();
        assert!(core.begin_complete().unwrap());
        assert!(matches!(core.begin_complete(), Err(TransactionError::State { operation: "complete", .. })));
        assert!(matches!(core.plan("d", None), Err(TransactionError::State { operation: "enlist", .. })));
    }

    #[test]
    fn test_dispose_in_progress_refuses_work() {
        let mut core = local_core();
        core.begin_dispose();
        assert_eq!(core.state(), ScopeState::Open);
        assert!(core.needs_rollback());
        assert!(matches!(core.plan("d", None), Err(TransactionError::State { operation: "enlist", .. })));
        assert!(matches!(core.begin_complete(), Err(TransactionError::State { operation: "complete", .. })));
    }

    #[test]
    fn test_pending_and_rollback_records() {
        let mut core = local_core();
        core.mark_committed(0);
        assert_eq!(core.pending_from(0), vec![1, 2]);

        assert!(core.record_rollback(1, Ok(())).is_none());
        let failure = core
            .record_rollback(2, Err(ParticipantError::NoActiveTransaction(Phase::Rollback)))
            .unwrap();
        assert_eq!(failure.participant, "c");
        assert!(core.pending_from(0).is_empty());

        let states: Vec<_> = core.participants().into_iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![ParticipantState::Committed, ParticipantState::RolledBack, ParticipantState::RolledBack]
        );
        assert_eq!(core.take_transactions(), vec![1, 2, 3]);
        assert!(core.participants().iter().all(|p| !p.has_transaction));
    }
}
