//! Participant adapter contract
//!
//! A participant is one connection taking part in a scope. Adapters wrap a
//! driver connection and hand out local transaction handles; the scope only
//! ever sees these traits, so any engine can join as long as it can begin,
//! commit and roll back.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use polytx_common::resilience::DriverCode;
use thiserror::Error;

use super::ambient::AmbientTransaction;
use super::isolation::IsolationLevel;
use crate::providers::{DriverError, DriverFault, ProviderKind};

/// Transaction lifecycle step a participant failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin => write!(f, "begin"),
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParticipantError {
    #[error("no active transaction to {0}")]
    NoActiveTransaction(Phase),

    #[error("{capability} is not supported by this connection")]
    Unsupported { capability: &'static str },

    /// Failure reported by the underlying driver, kept as-is
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl ParticipantError {
    pub fn driver<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Driver(Box::new(err))
    }

    pub fn unsupported(capability: &'static str) -> Self {
        Self::Unsupported { capability }
    }

    /// The original driver error, if it is a `T`
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        match self {
            Self::Driver(source) => source.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl DriverFault for ParticipantError {
    fn driver_code(&self) -> Option<DriverCode> {
        if let Some(err) = self.downcast_ref::<DriverError>() {
            return err.driver_code();
        }
        #[cfg(feature = "sqlite")]
        if let Some(err) = self.downcast_ref::<rusqlite::Error>() {
            return err.driver_code();
        }
        #[cfg(feature = "postgres")]
        if let Some(err) = self.downcast_ref::<tokio_postgres::Error>() {
            return err.driver_code();
        }
        None
    }

    fn provider(&self) -> Option<ProviderKind> {
        if let Some(err) = self.downcast_ref::<DriverError>() {
            return err.provider();
        }
        #[cfg(feature = "sqlite")]
        if let Some(err) = self.downcast_ref::<rusqlite::Error>() {
            return err.provider();
        }
        #[cfg(feature = "postgres")]
        if let Some(err) = self.downcast_ref::<tokio_postgres::Error>() {
            return err.provider();
        }
        None
    }
}

/// Handle to a local transaction on one connection
pub trait LocalTransaction: Send {
    fn commit(&self) -> Result<(), ParticipantError>;

    fn rollback(&self) -> Result<(), ParticipantError>;

    /// Release driver resources; called once the scope is done with the
    /// handle, whatever its outcome
    fn dispose(&self) {}
}

/// Connection able to join a [`TransactionScope`](super::TransactionScope)
pub trait ParticipantAdapter {
    /// Handle returned to the caller; the scope keeps its own clone
    type Transaction: LocalTransaction + Clone + 'static;

    /// Label used in logs and errors
    fn name(&self) -> &str;

    fn begin_local(&self, isolation: IsolationLevel) -> Result<Self::Transaction, ParticipantError>;

    fn enlist_ambient(&self, ambient: &AmbientTransaction) -> Result<(), ParticipantError>;
}

/// Suspending counterpart of [`LocalTransaction`]
#[async_trait]
pub trait AsyncLocalTransaction: Send + Sync {
    async fn commit(&self) -> Result<(), ParticipantError>;

    async fn rollback(&self) -> Result<(), ParticipantError>;

    /// Synchronous release hook; also used when the scope is dropped without
    /// being disposed
    fn dispose(&self) {}
}

/// Suspending counterpart of [`ParticipantAdapter`]
#[async_trait]
pub trait AsyncParticipantAdapter: Send + Sync {
    type Transaction: AsyncLocalTransaction + Clone + 'static;

    fn name(&self) -> &str;

    async fn begin_local(
        &self,
        isolation: IsolationLevel,
    ) -> Result<Self::Transaction, ParticipantError>;

    async fn enlist_ambient(&self, ambient: &AmbientTransaction) -> Result<(), ParticipantError>;
}
