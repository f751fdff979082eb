//! Participant adapters for real drivers, one feature per driver

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConnection, PostgresTransaction};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteTransaction};
