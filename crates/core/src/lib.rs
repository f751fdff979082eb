//! # Polytx Core
//!
//! Provider-aware retry and cross-connection transaction coordination.
//!
//! This crate contains:
//! - Transient-fault classifiers for SQL Server, PostgreSQL, MySQL, SQLite
//!   and Oracle, plus a provider registry and provider-bound retry
//! - Connection-string validation against per-engine rules
//! - Transaction scopes (blocking and suspending) over participant adapters
//! - Driver adapters for SQLite (`sqlite` feature) and PostgreSQL
//!   (`postgres` feature)
//! - Settings loading and mock participants for tests
//!
//! ## Architecture Principles
//! - Retry mechanics live in `polytx-common`; this crate supplies the
//!   per-engine policies
//! - Scopes only see the participant traits; drivers plug in through adapters
//! - No global state: ambient transactions and settings are passed explicitly

pub mod adapters;
pub mod config;
pub mod providers;
pub mod testing;
pub mod transaction;
pub mod validation;

pub use config::{PolytxConfig, RetrySettings, TransactionSettings};
pub use providers::{
    CodeClassifier, DriverError, DriverFault, ProviderEntry, ProviderKind, ProviderRegistry,
    ProviderRetry, RegistryError,
};
pub use transaction::{
    AmbientTransaction, AsyncTransactionScope, IsolationLevel, ParticipantError, ScopeOptions,
    TransactionError, TransactionScope,
};
pub use validation::{validate_connection_string, ValidationOutcome, ValidationStatus};
