//! SQLite participant over `rusqlite`
//!
//! The connection is shared behind a mutex so the caller's statements and the
//! scope's commit/rollback go through the same handle. SQLite has no
//! distributed transactions, so ambient enlistment is rejected.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::transaction::{
    AmbientTransaction, IsolationLevel, LocalTransaction, ParticipantAdapter, ParticipantError,
    Phase,
};

type SharedConnection = Arc<Mutex<Connection>>;

/// `BEGIN` statement for an isolation level
///
/// SQLite is serializable either way; `IMMEDIATE` takes the write lock up
/// front so later statements cannot fail with `SQLITE_BUSY` on upgrade.
pub fn begin_statement(isolation: IsolationLevel) -> &'static str {
    if isolation.is_at_least_repeatable_read() {
        "BEGIN IMMEDIATE"
    } else {
        "BEGIN DEFERRED"
    }
}

#[derive(Clone)]
pub struct SqliteConnection {
    name: String,
    conn: SharedConnection,
}

impl SqliteConnection {
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Ok(Self::from_connection(name, Connection::open(path)?))
    }

    pub fn open_in_memory(name: impl Into<String>) -> rusqlite::Result<Self> {
        Ok(Self::from_connection(name, Connection::open_in_memory()?))
    }

    pub fn from_connection(name: impl Into<String>, conn: Connection) -> Self {
        Self { name: name.into(), conn: Arc::new(Mutex::new(conn)) }
    }

    /// How long SQLite waits on a locked database before reporting busy
    pub fn set_busy_timeout(&self, timeout: Duration) -> rusqlite::Result<()> {
        self.conn.lock().busy_timeout(timeout)
    }

    pub fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.lock().execute_batch(sql)
    }

    /// Run `f` with exclusive access to the underlying connection
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<R>,
    ) -> rusqlite::Result<R> {
        f(&self.conn.lock())
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.lock().is_autocommit()
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection").field("name", &self.name).finish_non_exhaustive()
    }
}

impl ParticipantAdapter for SqliteConnection {
    type Transaction = SqliteTransaction;

    fn name(&self) -> &str {
        &self.name
    }

    fn begin_local(&self, isolation: IsolationLevel) -> Result<SqliteTransaction, ParticipantError> {
        let statement = begin_statement(isolation);
        self.conn.lock().execute_batch(statement).map_err(ParticipantError::driver)?;
        tracing::debug!(name = %self.name, statement, "SQLite transaction started");
        Ok(SqliteTransaction {
            name: self.name.clone(),
            conn: Arc::clone(&self.conn),
            active: Arc::new(AtomicBool::new(true)),
        })
    }

    fn enlist_ambient(&self, _ambient: &AmbientTransaction) -> Result<(), ParticipantError> {
        Err(ParticipantError::unsupported("ambient enlistment"))
    }
}

/// Local transaction on a [`SqliteConnection`]
#[derive(Clone)]
pub struct SqliteTransaction {
    name: String,
    conn: SharedConnection,
    active: Arc<AtomicBool>,
}

impl SqliteTransaction {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.lock().execute_batch(sql)
    }

    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<R>,
    ) -> rusqlite::Result<R> {
        f(&self.conn.lock())
    }

    /// Run `statement` and re-sync the active flag with SQLite's own state
    fn finish(&self, statement: &str, phase: Phase) -> Result<(), ParticipantError> {
        if !self.is_active() {
            return Err(ParticipantError::NoActiveTransaction(phase));
        }
        let conn = self.conn.lock();
        let result = conn.execute_batch(statement);
        self.active.store(!conn.is_autocommit(), Ordering::SeqCst);
        result.map_err(ParticipantError::driver)
    }
}

impl LocalTransaction for SqliteTransaction {
    fn commit(&self) -> Result<(), ParticipantError> {
        self.finish("COMMIT", Phase::Commit)
    }

    fn rollback(&self) -> Result<(), ParticipantError> {
        self.finish("ROLLBACK", Phase::Rollback)
    }

    fn dispose(&self) {
        if self.is_active() {
            if let Err(err) = self.rollback() {
                tracing::warn!(name = %self.name, error = %err, "Rollback on dispose failed");
            }
        }
    }
}

impl fmt::Debug for SqliteTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::DriverFault;

    fn conn(name: &str) -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory(name).unwrap();
        conn.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)").unwrap();
        conn
    }

    fn count(conn: &SqliteConnection) -> i64 {
        conn.with_connection(|c| c.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0)))
            .unwrap()
    }

    #[test]
    fn test_begin_statement() {
        assert_eq!(begin_statement(IsolationLevel::ReadCommitted), "BEGIN DEFERRED");
        assert_eq!(begin_statement(IsolationLevel::Serializable), "BEGIN IMMEDIATE");
    }

    #[test]
    fn test_commit_persists() {
        let conn = conn("main");
        let tx = conn.begin_local(IsolationLevel::ReadCommitted).unwrap();
        assert!(conn.in_transaction());
        tx.execute_batch("INSERT INTO items (label) VALUES ('a')").unwrap();
        tx.commit().unwrap();

        assert!(!tx.is_active());
        assert!(!conn.in_transaction());
        assert_eq!(count(&conn), 1);
    }

    /// Validates rollback and the inactive-handle guard.
    ///
    /// Assertions:
    /// - Rolled-back rows are gone.
    /// - A second rollback reports no active transaction.
    #[test]
    fn test_rollback_discards() {
        let conn = conn("main");
        let tx = conn.begin_local(IsolationLevel::Serializable).unwrap();
        tx.execute_batch("INSERT INTO items (label) VALUES ('a')").unwrap();
        tx.rollback().unwrap();

        assert_eq!(count(&conn), 0);
        assert!(matches!(tx.rollback(), Err(ParticipantError::NoActiveTransaction(Phase::Rollback))));
    }

    #[test]
    fn test_nested_begin_is_driver_error() {
        let conn = conn("main");
        let _tx = conn.begin_local(IsolationLevel::ReadCommitted).unwrap();
        let err = conn.begin_local(IsolationLevel::ReadCommitted).unwrap_err();
        assert!(err.downcast_ref::<rusqlite::Error>().is_some());
        assert!(err.driver_code().is_some());
    }

    #[test]
    fn test_ambient_unsupported() {
        let conn = conn("main");
        let ambient = AmbientTransaction::begin(IsolationLevel::ReadCommitted);
        assert!(matches!(conn.enlist_ambient(&ambient), Err(ParticipantError::Unsupported { .. })));
    }

    #[test]
    fn test_dispose_rolls_back_open_transaction() {
        let conn = conn("main");
        let tx = conn.begin_local(IsolationLevel::ReadCommitted).unwrap();
        tx.execute_batch("INSERT INTO items (label) VALUES ('a')").unwrap();
        tx.dispose();
        assert!(!conn.in_transaction());
        assert_eq!(count(&conn), 0);
    }
}
