//! Test doubles for scope and adapter tests

pub mod mock;

pub use mock::{
    MockAsyncConnection, MockAsyncTransaction, MockConnection, MockEvent, MockJournal,
    MockTransaction,
};
