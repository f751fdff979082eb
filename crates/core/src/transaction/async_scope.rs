//! Suspending transaction scope
//!
//! Same ordering and partial-failure rules as [`TransactionScope`], with
//! cancellation on `complete` and `dispose`. A drop cannot run async
//! rollbacks, so `dispose` must be awaited explicitly. Dropping an undisposed
//! scope logs a warning and only releases the handles.
//!
//! [`TransactionScope`]: super::TransactionScope

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ambient::AmbientTransaction;
use super::error::{RollbackFailure, TransactionError};
use super::participant::{AsyncLocalTransaction, AsyncParticipantAdapter, Phase};
use super::state::{EnlistPlan, ParticipantInfo, ScopeCore, ScopeMode, ScopeOptions, ScopeState};

/// One unit of work spanning several participants, driven from async code
///
/// Participants are the [`AsyncParticipantAdapter`]s passed to
/// [`enlist`](Self::enlist). Commits and rollbacks are awaited one at a time
/// in enlistment order, never concurrently.
///
/// ```rust,ignore
/// let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
/// let orders_tx = scope.enlist(&orders, None).await?;
/// let billing_tx = scope.enlist(&billing, None).await?;
/// // ... run statements on both connections ...
/// let outcome = scope.complete().await;
/// scope.dispose().await?;
/// outcome?;
/// ```
pub struct AsyncTransactionScope {
    core: ScopeCore<Box<dyn AsyncLocalTransaction>>,
}

impl AsyncTransactionScope {
    pub fn new(options: ScopeOptions) -> Self {
        Self { core: ScopeCore::new(options) }
    }

    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    pub fn options(&self) -> ScopeOptions {
        self.core.options()
    }

    pub fn mode(&self) -> Option<ScopeMode> {
        self.core.mode()
    }

    pub fn state(&self) -> ScopeState {
        self.core.state()
    }

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
    /// The first successful enlist fixes the mode. With an active ambient
    /// transaction and `prefer_ambient` set, the adapter joins the ambient
    /// transaction and `None` is returned. Otherwise a local transaction is
    /// begun at the scope's isolation level and its handle returned for
    /// immediate use. A failed adapter call records nothing.
    ///
    /// # Errors
    /// `State` once complete or dispose has been attempted,
    /// `NoActiveTransaction` when the captured ambient has finished, and
    /// `Begin` or `AmbientEnlist` carrying the adapter's failure.
    pub async fn enlist<A>(
        &mut self,
        adapter: &A,
        ambient: Option<&AmbientTransaction>,
    ) -> Result<Option<A::Transaction>, TransactionError>
    where
        A: AsyncParticipantAdapter + ?Sized,
    {
        let name = adapter.name();
        match self.core.plan(name, ambient)? {
            EnlistPlan::Ambient(ambient) => {
                if let Err(source) = adapter.enlist_ambient(&ambient).await {
                    return Err(TransactionError::AmbientEnlist {
                        participant: name.to_owned(),
                        ambient: ambient.id(),
                        source,
                    });
                }
                self.core.record_ambient(name, ambient);
                Ok(None)
            }
            EnlistPlan::Local(isolation) => match adapter.begin_local(isolation).await {
                Ok(transaction) => {
                    self.core.record_local(name, isolation, Box::new(transaction.clone()));
                    Ok(Some(transaction))
                }
                Err(source) => {
                    tracing::warn!(scope = %self.core.id(), name, error = %source, "Begin failed");
                    Err(TransactionError::Begin { participant: name.to_owned(), source })
                }
            },
        }
    }

    /// Commit every local participant in enlistment order
    ///
    /// On the first failed commit that participant and every later one are
    /// rolled back, earlier commits stand, and the commit error is returned
    /// with the driver error as its source. May be called once. In ambient
    /// mode this only marks the scope completed.
    pub async fn complete(&mut self) -> Result<(), TransactionError> {
        self.complete_with_cancel(&CancellationToken::new()).await
    }

    /// Commit in enlistment order, stopping when `cancel` fires
    ///
    /// Cancellation seen between commits rolls back the participants not yet
    /// committed. Cancellation that interrupts a commit leaves that commit's
    /// outcome unknown; it is treated as failed and rolled back along with
    /// the rest. Rollbacks after cancellation run without the token.
    pub async fn complete_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), TransactionError> {
        if !self.core.begin_complete()? {
            return Ok(());
        }

        for index in 0..self.core.len() {
            if cancel.is_cancelled() {
                return Err(self.cancel_commit(index, false).await);
            }
            let Some(transaction) = self.core.transaction(index) else {
                continue;
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = transaction.commit() => Some(result),
            };

            match outcome {
                Some(Ok(())) => self.core.mark_committed(index),
                Some(Err(source)) => {
                    let participant = self.core.name(index).to_owned();
                    tracing::error!(
                        scope = %self.core.id(),
                        participant = index,
                        name = %participant,
                        error = %source,
                        "Commit failed, rolling back remaining participants"
                    );
                    self.roll_back_from(index).await;
                    return Err(TransactionError::Commit { participant, index, source });
                }
                None => return Err(self.cancel_commit(index, true).await),
            }
        }

        self.core.mark_completed();
        Ok(())
    }

    async fn cancel_commit(&mut self, index: usize, outcome_unknown: bool) -> TransactionError {
        let participant = self.core.name(index).to_owned();
        tracing::warn!(
            scope = %self.core.id(),
            participant = index,
            name = %participant,
            outcome_unknown,
            "Complete cancelled, rolling back remaining participants"
        );
        self.roll_back_from(index).await;
        TransactionError::Cancelled { participant, index, phase: Phase::Commit, outcome_unknown }
    }

    /// Roll back every local participant not yet committed, then release
    /// the handles
    ///
    /// Rollbacks run in enlistment order and continue past failures, which
    /// are returned together as [`TransactionError::Rollback`]. A completed
    /// or ambient scope has nothing to roll back. Idempotent once it has
    /// returned without cancellation.
    pub async fn dispose(&mut self) -> Result<(), TransactionError> {
        self.dispose_with_cancel(&CancellationToken::new()).await
    }

    /// [`dispose`](Self::dispose), stopping when `cancel` fires
    ///
    /// On cancellation the scope stays Open with its remaining participants
    /// and handles, and no further enlist or complete is accepted. A later
    /// `dispose` resumes the rollbacks from the first participant still
    /// enlisted; a rollback that was interrupted is issued again.
    pub async fn dispose_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), TransactionError> {
        if self.core.is_disposed() {
            return Ok(());
        }
        self.core.begin_dispose();

        let mut failures = Vec::new();
        if self.core.needs_rollback() {
            for index in self.core.pending_from(0) {
                // Err carries whether a rollback was interrupted in flight
                let outcome = if cancel.is_cancelled() {
                    Err(false)
                } else {
                    let Some(transaction) = self.core.transaction(index) else {
                        continue;
                    };
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(true),
                        result = transaction.rollback() => Ok(result),
                    }
                };

                match outcome {
                    Ok(result) => failures.extend(self.core.record_rollback(index, result)),
                    Err(outcome_unknown) => {
                        let participant = self.core.name(index).to_owned();
                        tracing::warn!(
                            scope = %self.core.id(),
                            participant = index,
                            name = %participant,
                            pending = self.core.pending_from(index).len(),
                            failed = failures.len(),
                            outcome_unknown,
                            "Dispose cancelled, scope left open for another dispose"
                        );
                        return Err(TransactionError::Cancelled {
                            participant,
                            index,
                            phase: Phase::Rollback,
                            outcome_unknown,
                        });
                    }
                }
            }
        }

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

    async fn roll_back_from(&mut self, start: usize) -> Vec<RollbackFailure> {
        let mut failures = Vec::new();
        for index in self.core.pending_from(start) {
            let Some(transaction) = self.core.transaction(index) else {
                continue;
            };
            let result = transaction.rollback().await;
            failures.extend(self.core.record_rollback(index, result));
        }
        failures
    }
}

impl Drop for AsyncTransactionScope {
    fn drop(&mut self) {
        if self.core.is_disposed() {
            return;
        }
        if self.core.needs_rollback() {
            tracing::warn!(
                scope = %self.core.id(),
                pending = self.core.pending_from(0).len(),
                "Async scope dropped without dispose; uncommitted work is left to the drivers"
            );
        }
        for transaction in self.core.take_transactions() {
            transaction.dispose();
        }
    }
}

impl std::fmt::Debug for AsyncTransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTransactionScope")
            .field("id", &self.core.id())
            .field("mode", &self.core.mode())
            .field("state", &self.core.state())
            .field("participants", &self.core.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{MockAsyncConnection, MockJournal};
    use crate::transaction::{IsolationLevel, ParticipantError, ParticipantState};

    fn connections(journal: &MockJournal, names: &[&str]) -> Vec<MockAsyncConnection> {
        names.iter().map(|name| MockAsyncConnection::new(*name, journal.clone())).collect()
    }

    async fn enlist_all(scope: &mut AsyncTransactionScope, conns: &[MockAsyncConnection]) {
        for conn in conns {
            scope.enlist(conn, None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_complete_commits_in_order() {
        let journal = MockJournal::new();
        let conns = connections(&journal, &["a", "b"]);
        let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
        enlist_all(&mut scope, &conns).await;

        scope.complete().await.unwrap();
        scope.dispose().await.unwrap();
        assert_eq!(journal.commits(), vec!["a", "b"]);
        assert!(journal.rollbacks().is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back_rest() {
        let journal = MockJournal::new();
        let conns = connections(&journal, &["a", "b", "c"]);
        conns[1].fail_commit_with(ParticipantError::unsupported("commit"));
        let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
        enlist_all(&mut scope, &conns).await;

        let err = scope.complete().await.unwrap_err();
        assert!(matches!(err, TransactionError::Commit { index: 1, .. }));
        assert_eq!(journal.commits(), vec!["a"]);
        assert_eq!(journal.rollbacks(), vec!["b", "c"]);
        scope.dispose().await.unwrap();
    }

    /// Validates cancellation before the first commit.
    ///
    /// Assertions:
    /// - Nothing is committed.
    /// - Every participant is rolled back.
    /// - The error reports a known outcome.
    #[tokio::test]
    async fn test_cancel_before_commit() {
        let journal = MockJournal::new();
        let conns = connections(&journal, &["a", "b"]);
        let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
        enlist_all(&mut scope, &conns).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = scope.complete_with_cancel(&cancel).await.unwrap_err();

        assert!(matches!(
            err,
            TransactionError::Cancelled { index: 0, phase: Phase::Commit, outcome_unknown: false, .. }
        ));
        assert!(journal.commits().is_empty());
        assert_eq!(journal.rollbacks(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_cancel_during_inflight_commit() {
        let journal = MockJournal::new();
        let conns = connections(&journal, &["a", "b", "c"]);
        conns[1].delay_commit(Duration::from_secs(5));
        let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
        enlist_all(&mut scope, &conns).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = scope.complete_with_cancel(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Cancelled { index: 1, phase: Phase::Commit, outcome_unknown: true, .. }
        ));
        assert_eq!(journal.commits(), vec!["a"]);
        assert_eq!(journal.rollbacks(), vec!["b", "c"]);

        let states: Vec<_> = scope.participants().into_iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![ParticipantState::Committed, ParticipantState::RolledBack, ParticipantState::RolledBack]
        );
    }

    /// Validates a cancelled dispose can be finished later.
    ///
    /// Assertions:
    /// - The cancelled call rolls back nothing and keeps the scope Open.
    /// - Enlist and complete are refused in between.
    /// - The next `dispose` rolls back every participant and releases the
    ///   handles once.
    #[tokio::test]
    async fn test_cancelled_dispose_resumes() {
        let journal = MockJournal::new();
        let conns = connections(&journal, &["a", "b"]);
        let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
        enlist_all(&mut scope, &conns).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = scope.dispose_with_cancel(&cancel).await.unwrap_err();

        assert!(matches!(
            err,
            TransactionError::Cancelled { index: 0, phase: Phase::Rollback, outcome_unknown: false, .. }
        ));
        assert!(journal.rollbacks().is_empty());
        assert!(journal.disposals().is_empty());
        assert_eq!(scope.state(), ScopeState::Open);
        assert!(matches!(scope.enlist(&conns[0], None).await, Err(TransactionError::State { .. })));
        assert!(matches!(scope.complete().await, Err(TransactionError::State { .. })));

        scope.dispose().await.unwrap();
        assert_eq!(journal.rollbacks(), vec!["a", "b"]);
        assert_eq!(journal.disposals(), vec!["a", "b"]);
        assert_eq!(scope.state(), ScopeState::Disposed);
        assert!(scope.participants().iter().all(|p| p.state == ParticipantState::RolledBack));
    }

    #[tokio::test]
    async fn test_ambient_enlist_once() {
        let journal = MockJournal::new();
        let conn = MockAsyncConnection::new("a", journal.clone());
        let ambient = AmbientTransaction::begin(IsolationLevel::ReadCommitted);

        let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
        assert!(scope.enlist(&conn, Some(&ambient)).await.unwrap().is_none());
        scope.complete().await.unwrap();
        scope.dispose().await.unwrap();

        assert_eq!(journal.events().len(), 1);
        assert_eq!(ambient.enlistment_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_without_dispose_releases_handles() {
        let journal = MockJournal::new();
        let conns = connections(&journal, &["a", "b"]);
        {
            let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
            enlist_all(&mut scope, &conns).await;
        }
        assert!(journal.rollbacks().is_empty());
        assert_eq!(journal.disposals(), vec!["a", "b"]);
    }
}
