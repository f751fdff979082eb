//! Integration tests for the suspending scope
//!
//! Covers ordering under cancellation and retrying a whole unit of work with
//! a provider classifier when a commit loses a deadlock.

use std::sync::Arc;
use std::time::Duration;

use polytx_common::resilience::{DriverCode, Jitter, RetryOptions};
use polytx_common::testing::RecordingSleeper;
use polytx_core::providers::{DriverError, ProviderKind, ProviderRetry};
use polytx_core::testing::{MockAsyncConnection, MockJournal};
use polytx_core::transaction::{
    AsyncTransactionScope, ParticipantError, ParticipantState, Phase, ScopeOptions, ScopeState,
    TransactionError,
};
use tokio_util::sync::CancellationToken;

fn participants(journal: &MockJournal, count: usize) -> Vec<MockAsyncConnection> {
    (0..count).map(|i| MockAsyncConnection::new(format!("db{i}"), journal.clone())).collect()
}

async fn open_scope(conns: &[MockAsyncConnection]) -> AsyncTransactionScope {
    let mut scope = AsyncTransactionScope::new(ScopeOptions::default());
    for conn in conns {
        scope.enlist(conn, None).await.expect("enlist").expect("local handle");
    }
    scope
}

/// Validates a unit of work retried after a commit-time deadlock.
///
/// Assertions:
/// - The first attempt's scope rolls back the deadlocked participant and the
///   one after it.
/// - The retry record carries SQL Server code 1205.
/// - The second attempt commits every participant.
#[tokio::test]
async fn deadlocked_unit_of_work_is_retried() {
    let journal = MockJournal::new();
    let conns = Arc::new(participants(&journal, 3));
    conns[1].fail_commit_with(ParticipantError::driver(DriverError::numeric(
        ProviderKind::SqlServer,
        1205,
        "transaction was deadlocked",
    )));

    let sleeper = Arc::new(RecordingSleeper::new());
    let options = RetryOptions::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(10))
        .max_delay(Duration::from_millis(100))
        .jitter(Jitter::None)
        .sleeper(sleeper.clone())
        .build()
        .expect("valid retry options");
    let retry = ProviderRetry::new(ProviderKind::SqlServer, options);
    let cancel = CancellationToken::new();
    let mut codes = Vec::new();

    let result = retry
        .run_async_observed(
            || {
                let conns = Arc::clone(&conns);
                async move {
                    let mut scope = open_scope(&conns).await;
                    let outcome = scope.complete().await;
                    scope.dispose().await?;
                    outcome
                }
            },
            &cancel,
            |attempt| codes.push(attempt.error_code.clone()),
        )
        .await;

    assert!(result.is_ok(), "second attempt commits: {result:?}");
    assert_eq!(codes, vec![Some(DriverCode::Numeric(1205))]);
    assert_eq!(journal.commits(), vec!["db0", "db0", "db1", "db2"]);
    assert_eq!(journal.rollbacks(), vec!["db1", "db2"]);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(10)]);
}

#[tokio::test]
async fn permanent_commit_failure_is_not_retried() {
    let journal = MockJournal::new();
    let conns = Arc::new(participants(&journal, 2));
    conns[0].fail_commit_with(ParticipantError::driver(DriverError::numeric(
        ProviderKind::SqlServer,
        547,
        "constraint conflict",
    )));
    let sleeper = Arc::new(RecordingSleeper::new());
    let options = RetryOptions::default().with_sleeper(sleeper.clone());
    let retry = ProviderRetry::new(ProviderKind::SqlServer, options);
    let cancel = CancellationToken::new();

    let result = retry
        .run_async(
            || {
                let conns = Arc::clone(&conns);
                async move {
                    let mut scope = open_scope(&conns).await;
                    let outcome = scope.complete().await;
                    scope.dispose().await?;
                    outcome
                }
            },
            &cancel,
        )
        .await;

    let err = result.expect_err("constraint conflicts are permanent").into_operation_error();
    assert!(matches!(err, Some(TransactionError::Commit { index: 0, .. })));
    assert_eq!(sleeper.count(), 0);
    assert_eq!(journal.rollbacks(), vec!["db0", "db1"]);
}

/// Validates cancellation between commits in a longer scope.
///
/// Assertions:
/// - Commits that finished before the cancel stay committed.
/// - The in-flight commit and the rest are rolled back.
#[tokio::test]
async fn cancellation_mid_complete_keeps_earlier_commits() {
    let journal = MockJournal::new();
    let conns = participants(&journal, 4);
    conns[2].delay_commit(Duration::from_secs(5));
    let mut scope = open_scope(&conns).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        trigger.cancel();
    });

    let err = scope.complete_with_cancel(&cancel).await.expect_err("cancelled");
    timer.await.expect("timer task");

    let TransactionError::Cancelled { participant, index, phase, outcome_unknown } = err else {
        panic!("expected cancellation");
    };
    assert_eq!((participant.as_str(), index, phase, outcome_unknown), ("db2", 2, Phase::Commit, true));
    assert_eq!(journal.commits(), vec!["db0", "db1"]);
    assert_eq!(journal.rollbacks(), vec!["db2", "db3"]);

    scope.dispose().await.expect("dispose");
    assert_eq!(scope.state(), ScopeState::Disposed);
}

#[tokio::test]
async fn dispose_collects_rollback_failures() {
    let journal = MockJournal::new();
    let conns = participants(&journal, 3);
    conns[1].fail_rollback_with(ParticipantError::NoActiveTransaction(Phase::Rollback));
    let mut scope = open_scope(&conns).await;

    let err = scope.dispose().await.expect_err("one rollback fails");
    let TransactionError::Rollback { failures } = err else {
        panic!("expected rollback failures");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].participant, "db1");
    assert_eq!(journal.rollbacks(), vec!["db0", "db2"]);
    assert!(scope.participants().iter().all(|p| p.state == ParticipantState::RolledBack));
    assert_eq!(journal.disposals(), vec!["db0", "db1", "db2"]);
}
