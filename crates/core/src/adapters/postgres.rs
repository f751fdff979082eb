//! PostgreSQL participant over `tokio-postgres`

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};

use crate::transaction::{
    AmbientTransaction, AsyncLocalTransaction, AsyncParticipantAdapter, IsolationLevel,
    ParticipantError, Phase,
};

/// `BEGIN` statement for an isolation level
///
/// PostgreSQL's repeatable read is snapshot isolation, so `Snapshot` maps
/// onto it.
pub fn begin_statement(isolation: IsolationLevel) -> String {
    let level = match isolation {
        IsolationLevel::Snapshot => IsolationLevel::RepeatableRead,
        other => other,
    };
    format!("BEGIN ISOLATION LEVEL {}", level.as_sql())
}

#[derive(Clone)]
pub struct PostgresConnection {
    name: String,
    client: Arc<Client>,
}

impl PostgresConnection {
    pub fn new(name: impl Into<String>, client: Client) -> Self {
        Self::from_shared(name, Arc::new(client))
    }

    pub fn from_shared(name: impl Into<String>, client: Arc<Client>) -> Self {
        Self { name: name.into(), client }
    }

    /// Connect without TLS and drive the connection on a background task
    pub async fn connect(name: impl Into<String>, config: &str) -> Result<Self, tokio_postgres::Error> {
        let name = name.into();
        let (client, connection) = tokio_postgres::connect(config, NoTls).await?;
        let task_name = name.clone();
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(name = %task_name, error = %err, "PostgreSQL connection closed with error");
            }
        });
        Ok(Self::new(name, client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl AsyncParticipantAdapter for PostgresConnection {
    type Transaction = PostgresTransaction;

    fn name(&self) -> &str {
        &self.name
    }

    async fn begin_local(
        &self,
        isolation: IsolationLevel,
    ) -> Result<PostgresTransaction, ParticipantError> {
        let statement = begin_statement(isolation);
        self.client.batch_execute(&statement).await.map_err(ParticipantError::driver)?;
        tracing::debug!(name = %self.name, statement = %statement, "PostgreSQL transaction started");
        Ok(PostgresTransaction {
            name: self.name.clone(),
            client: Arc::clone(&self.client),
            active: Arc::new(AtomicBool::new(true)),
        })
    }

    async fn enlist_ambient(&self, _ambient: &AmbientTransaction) -> Result<(), ParticipantError> {
        Err(ParticipantError::unsupported("ambient enlistment"))
    }
}

#[derive(Clone)]
pub struct PostgresTransaction {
    name: String,
    client: Arc<Client>,
    active: Arc<AtomicBool>,
}

impl PostgresTransaction {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsyncLocalTransaction for PostgresTransaction {
    async fn commit(&self) -> Result<(), ParticipantError> {
        if !self.is_active() {
            return Err(ParticipantError::NoActiveTransaction(Phase::Commit));
        }
        // A failed COMMIT leaves the flag set; the following ROLLBACK is
        // harmless and clears it.
        self.client.batch_execute("COMMIT").await.map_err(ParticipantError::driver)?;
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ParticipantError> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Err(ParticipantError::NoActiveTransaction(Phase::Rollback));
        }
        self.client.batch_execute("ROLLBACK").await.map_err(ParticipantError::driver)
    }

    fn dispose(&self) {
        if self.is_active() {
            tracing::warn!(name = %self.name, "PostgreSQL transaction released while still open");
        }
    }
}

impl fmt::Debug for PostgresTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresTransaction")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}
