//! Blocking transaction scope
//!
//! Coordinates several connections as one logical unit of work. Participants
//! commit strictly in enlistment order; this is best-effort coordination, not
//! two-phase commit, so a failure part-way through leaves the earlier
//! participants committed.

use uuid::Uuid;

use super::ambient::AmbientTransaction;
use super::error::{RollbackFailure, TransactionError};
use super::participant::{LocalTransaction, ParticipantAdapter};
use super::state::{EnlistPlan, ParticipantInfo, ScopeCore, ScopeMode, ScopeOptions, ScopeState};

/// One unit of work spanning several participants
///
/// ```rust,ignore
/// let mut scope = TransactionScope::new(ScopeOptions::default());
/// let orders_tx = scope.enlist(&orders, None)?;
/// let billing_tx = scope.enlist(&billing, None)?;
/// // ... run statements on both connections ...
/// scope.complete()?;
/// ```
///
/// Dropping the scope without completing it rolls back every participant.
pub struct TransactionScope {
    core: ScopeCore<Box<dyn LocalTransaction>>,
}

impl TransactionScope {
    pub fn new(options: ScopeOptions) -> Self {
        Self { core: ScopeCore::new(options) }
    }

    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    pub fn options(&self) -> ScopeOptions {
        self.core.options()
    }

    /// `None` until the first successful enlistment
    pub fn mode(&self) -> Option<ScopeMode> {
        self.core.mode()
    }

    pub fn state(&self) -> ScopeState {
        self.core.state()
    }

    /// Ambient transaction captured by the first enlistment, if any
    pub fn ambient(&self) -> Option<&AmbientTransaction> {
        self.core.ambient()
    }

    pub fn participant_count(&self) -> usize {
        self.core.len()
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        self.core.participants()
    }

    /// Add a connection to the scope
    ///
    /// Joins the ambient transaction when one is active and preferred (and
    /// returns `None`); otherwise begins a local transaction at the scope's
    /// isolation level and returns its handle. Nothing is recorded when the
    /// adapter call fails.
    pub fn enlist<A>(
        &mut self,
        adapter: &A,
        ambient: Option<&AmbientTransaction>,
    ) -> Result<Option<A::Transaction>, TransactionError>
    where
        A: ParticipantAdapter + ?Sized,
    {
        let name = adapter.name();
        match self.core.plan(name, ambient)? {
            EnlistPlan::Ambient(ambient) => {
                adapter.enlist_ambient(&ambient).map_err(|source| {
                    TransactionError::AmbientEnlist {
                        participant: name.to_owned(),
                        ambient: ambient.id(),
                        source,
                    }
                })?;
                self.core.record_ambient(name, ambient);
                Ok(None)
            }
            EnlistPlan::Local(isolation) => {
                let transaction = adapter.begin_local(isolation).map_err(|source| {
                    tracing::warn!(scope = %self.core.id(), name, error = %source, "Begin failed");
                    TransactionError::Begin { participant: name.to_owned(), source }
                })?;
                self.core.record_local(name, isolation, Box::new(transaction.clone()));
                Ok(Some(transaction))
            }
        }
    }

    /// Commit every local participant in enlistment order
    ///
    /// On the first commit failure that participant and every later one are
    /// rolled back and the commit error is returned; the scope is then no
    /// longer completable. In ambient mode this only marks the scope
    /// completed.
    pub fn complete(&mut self) -> Result<(), TransactionError> {
        if !self.core.begin_complete()? {
            return Ok(());
        }

        for index in 0..self.core.len() {
            let Some(transaction) = self.core.transaction(index) else {
                continue;
            };
            match transaction.commit() {
                Ok(()) => self.core.mark_committed(index),
                Err(source) => {
                    let participant = self.core.name(index).to_owned();
                    tracing::error!(
                        scope = %self.core.id(),
                        participant = index,
                        name = %participant,
                        error = %source,
                        "Commit failed, rolling back remaining participants"
                    );
                    self.roll_back_from(index);
                    return Err(TransactionError::Commit { participant, index, source });
                }
            }
        }

        self.core.mark_completed();
        Ok(())
    }

    /// Roll back everything not committed and release the handles
    ///
    /// Idempotent. Every rollback is attempted even when some fail; the
    /// failures are returned together.
    pub fn dispose(&mut self) -> Result<(), TransactionError> {
        if self.core.is_disposed() {
            return Ok(());
        }

        let failures = if self.core.needs_rollback() { self.roll_back_from(0) } else { Vec::new() };

        for transaction in self.core.take_transactions() {
            transaction.dispose();
        }
        self.core.mark_disposed();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransactionError::Rollback { failures })
        }
    }

    fn roll_back_from(&mut self, start: usize) -> Vec<RollbackFailure> {
        let mut failures = Vec::new();
        for index in self.core.pending_from(start) {
            let Some(transaction) = self.core.transaction(index) else {
                continue;
            };
            let result = transaction.rollback();
            failures.extend(self.core.record_rollback(index, result));
        }
        failures
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            tracing::warn!(scope = %self.core.id(), error = %err, "Dispose on drop failed");
        }
    }
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("id", &self.core.id())
            .field("mode", &self.core.mode())
            .field("state", &self.core.state())
            .field("participants", &self.core.len())
            .finish()
    }
}
