//! Scripted participant connections
//!
//! Every mock writes what it did to a shared [`MockJournal`], so a test can
//! assert on the order of begins, commits and rollbacks across several
//! connections. Failures are scripted per connection and fire once.

#![allow(clippy::missing_errors_doc)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::transaction::{
    AmbientTransaction, AsyncLocalTransaction, AsyncParticipantAdapter, IsolationLevel,
    LocalTransaction, ParticipantAdapter, ParticipantError, Phase,
};

type EventLog = Arc<Mutex<Vec<MockEvent>>>;
type ScriptedFailure = Mutex<Option<ParticipantError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Begin { name: String, isolation: IsolationLevel },
    EnlistAmbient { name: String, ambient: Uuid },
    Commit { name: String },
    Rollback { name: String },
    Dispose { name: String },
}

/// Ordered record of every mock call, shared between connections
#[derive(Debug, Clone, Default)]
pub struct MockJournal {
    events: EventLog,
}

impl MockJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.names(|event| match event {
            MockEvent::Commit { name } => Some(name),
            _ => None,
        })
    }

    pub fn rollbacks(&self) -> Vec<String> {
        self.names(|event| match event {
            MockEvent::Rollback { name } => Some(name),
            _ => None,
        })
    }

    pub fn disposals(&self) -> Vec<String> {
        self.names(|event| match event {
            MockEvent::Dispose { name } => Some(name),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn names(&self, select: impl Fn(&MockEvent) -> Option<&String>) -> Vec<String> {
        self.events.lock().iter().filter_map(|event| select(event).cloned()).collect()
    }

    fn push(&self, event: MockEvent) {
        self.events.lock().push(event);
    }
}

#[derive(Debug, Default)]
struct Script {
    begin: ScriptedFailure,
    ambient: ScriptedFailure,
    commit: ScriptedFailure,
    rollback: ScriptedFailure,
    commit_delay: Mutex<Option<Duration>>,
}

impl Script {
    fn take(slot: &ScriptedFailure) -> Result<(), ParticipantError> {
        match slot.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// State shared by the blocking and suspending mocks
#[derive(Debug, Clone)]
struct MockCore {
    name: String,
    journal: MockJournal,
    script: Arc<Script>,
}

impl MockCore {
    fn new(name: impl Into<String>, journal: MockJournal) -> Self {
        Self { name: name.into(), journal, script: Arc::new(Script::default()) }
    }

    fn begin(&self, isolation: IsolationLevel) -> Result<(), ParticipantError> {
        Script::take(&self.script.begin)?;
        self.journal.push(MockEvent::Begin { name: self.name.clone(), isolation });
        Ok(())
    }

    fn enlist(&self, ambient: &AmbientTransaction) -> Result<(), ParticipantError> {
        Script::take(&self.script.ambient)?;
        if !ambient.is_active() {
            return Err(ParticipantError::NoActiveTransaction(Phase::Begin));
        }
        self.journal.push(MockEvent::EnlistAmbient { name: self.name.clone(), ambient: ambient.id() });
        Ok(())
    }

    fn commit(&self) -> Result<(), ParticipantError> {
        Script::take(&self.script.commit)?;
        self.journal.push(MockEvent::Commit { name: self.name.clone() });
        Ok(())
    }

    fn rollback(&self) -> Result<(), ParticipantError> {
        Script::take(&self.script.rollback)?;
        self.journal.push(MockEvent::Rollback { name: self.name.clone() });
        Ok(())
    }

    fn dispose(&self) {
        self.journal.push(MockEvent::Dispose { name: self.name.clone() });
    }
}

macro_rules! scripted_failures {
    () => {
        /// Fail the next `begin_local` with `err`
        pub fn fail_begin_with(&self, err: ParticipantError) {
            *self.core.script.begin.lock() = Some(err);
        }

        /// Fail the next `enlist_ambient` with `err`
        pub fn fail_ambient_with(&self, err: ParticipantError) {
            *self.core.script.ambient.lock() = Some(err);
        }

        /// Fail the next commit with `err`
        pub fn fail_commit_with(&self, err: ParticipantError) {
            *self.core.script.commit.lock() = Some(err);
        }

        /// Fail the next rollback with `err`
        pub fn fail_rollback_with(&self, err: ParticipantError) {
            *self.core.script.rollback.lock() = Some(err);
        }

        pub fn name(&self) -> &str {
            &self.core.name
        }
    };
}

/// Blocking mock participant
#[derive(Debug, Clone)]
pub struct MockConnection {
    core: MockCore,
}

impl MockConnection {
    pub fn new(name: impl Into<String>, journal: MockJournal) -> Self {
        Self { core: MockCore::new(name, journal) }
    }

    scripted_failures!();
}

#[derive(Debug, Clone)]
pub struct MockTransaction {
    core: MockCore,
}

impl LocalTransaction for MockTransaction {
    fn commit(&self) -> Result<(), ParticipantError> {
        self.core.commit()
    }

    fn rollback(&self) -> Result<(), ParticipantError> {
        self.core.rollback()
    }

    fn dispose(&self) {
        self.core.dispose();
    }
}

impl ParticipantAdapter for MockConnection {
    type Transaction = MockTransaction;

    fn name(&self) -> &str {
        &self.core.name
    }

    fn begin_local(&self, isolation: IsolationLevel) -> Result<MockTransaction, ParticipantError> {
        self.core.begin(isolation)?;
        Ok(MockTransaction { core: self.core.clone() })
    }

    fn enlist_ambient(&self, ambient: &AmbientTransaction) -> Result<(), ParticipantError> {
        self.core.enlist(ambient)
    }
}

/// Suspending mock participant
#[derive(Debug, Clone)]
pub struct MockAsyncConnection {
    core: MockCore,
}

impl MockAsyncConnection {
    pub fn new(name: impl Into<String>, journal: MockJournal) -> Self {
        Self { core: MockCore::new(name, journal) }
    }

    /// Make every commit suspend for `delay` before it is recorded
    pub fn delay_commit(&self, delay: Duration) {
        *self.core.script.commit_delay.lock() = Some(delay);
    }

    scripted_failures!();
}

#[derive(Debug, Clone)]
pub struct MockAsyncTransaction {
    core: MockCore,
}

#[async_trait]
impl AsyncLocalTransaction for MockAsyncTransaction {
    async fn commit(&self) -> Result<(), ParticipantError> {
        let delay = *self.core.script.commit_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.core.commit()
    }

    async fn rollback(&self) -> Result<(), ParticipantError> {
        tokio::task::yield_now().await;
        self.core.rollback()
    }

    fn dispose(&self) {
        self.core.dispose();
    }
}

#[async_trait]
impl AsyncParticipantAdapter for MockAsyncConnection {
    type Transaction = MockAsyncTransaction;

    fn name(&self) -> &str {
        &self.core.name
    }

    async fn begin_local(
        &self,
        isolation: IsolationLevel,
    ) -> Result<MockAsyncTransaction, ParticipantError> {
        self.core.begin(isolation)?;
        Ok(MockAsyncTransaction { core: self.core.clone() })
    }

    async fn enlist_ambient(&self, ambient: &AmbientTransaction) -> Result<(), ParticipantError> {
        self.core.enlist(ambient)
    }
}
