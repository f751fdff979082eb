//! Cross-connection transaction coordination
//!
//! A scope groups several participant connections into one unit of work.
//! Each participant either joins an explicit [`AmbientTransaction`] or runs
//! its own local transaction; local transactions are committed strictly in
//! enlistment order and rolled back on any other exit path.
//!
//! This is ordered best-effort commit, not two-phase commit: when participant
//! `k` fails to commit, participants before it stay committed.

pub mod ambient;
pub mod async_scope;
pub mod error;
pub mod isolation;
pub mod participant;
pub mod scope;
pub mod state;

pub use ambient::{AmbientStatus, AmbientTransaction};
pub use async_scope::AsyncTransactionScope;
pub use error::{RollbackFailure, TransactionError};
pub use isolation::IsolationLevel;
pub use participant::{
    AsyncLocalTransaction, AsyncParticipantAdapter, LocalTransaction, ParticipantAdapter,
    ParticipantError, Phase,
};
pub use scope::TransactionScope;
pub use state::{ParticipantInfo, ParticipantState, ScopeMode, ScopeOptions, ScopeState};
