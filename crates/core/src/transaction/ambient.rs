//! Explicit ambient transaction context
//!
//! An ambient transaction is owned by whoever began it (an outer unit of work
//! or an external coordinator). Scopes never commit or abort it; they only
//! enlist participants into it. The handle is passed explicitly to
//! [`TransactionScope::enlist`](super::TransactionScope::enlist) instead of
//! being looked up from thread-local or task-local state.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::error::TransactionError;
use super::isolation::IsolationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientStatus {
    Active,
    Committed,
    Aborted,
}

impl fmt::Display for AmbientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Committed => write!(f, "committed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug)]
struct AmbientInner {
    id: Uuid,
    isolation: IsolationLevel,
    status: Mutex<AmbientStatus>,
    enlistments: AtomicUsize,
}

/// Shared handle to an ambient transaction; clones refer to the same one
#[derive(Debug, Clone)]
pub struct AmbientTransaction {
    inner: Arc<AmbientInner>,
}

impl AmbientTransaction {
    /// Start a new active ambient transaction
    pub fn begin(isolation: IsolationLevel) -> Self {
        let inner = AmbientInner {
            id: Uuid::new_v4(),
            isolation,
            status: Mutex::new(AmbientStatus::Active),
            enlistments: AtomicUsize::new(0),
        };
        tracing::debug!(ambient = %inner.id, isolation = %isolation, "Ambient transaction started");
        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.inner.isolation
    }

    pub fn status(&self) -> AmbientStatus {
        *self.inner.status.lock()
    }

    pub fn is_active(&self) -> bool {
        self.status() == AmbientStatus::Active
    }

    /// Number of participants enlisted so far, across all scopes
    pub fn enlistment_count(&self) -> usize {
        self.inner.enlistments.load(Ordering::SeqCst)
    }

    pub(crate) fn record_enlistment(&self) {
        self.inner.enlistments.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark the ambient transaction committed; only valid while active
    pub fn complete(&self) -> Result<(), TransactionError> {
        self.finish(AmbientStatus::Committed, "complete")
    }

    /// Mark the ambient transaction aborted; only valid while active
    pub fn abort(&self) -> Result<(), TransactionError> {
        self.finish(AmbientStatus::Aborted, "abort")
    }

    fn finish(&self, target: AmbientStatus, operation: &'static str) -> Result<(), TransactionError> {
        let mut status = self.inner.status.lock();
        if *status != AmbientStatus::Active {
            return Err(TransactionError::State {
                operation,
                reason: format!("ambient transaction {} is already {}", self.inner.id, *status),
            });
        }
        *status = target;
        tracing::debug!(ambient = %self.inner.id, status = %target, "Ambient transaction finished");
        Ok(())
    }
}

impl PartialEq for AmbientTransaction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for AmbientTransaction {}
