//! Transient-fault retry engine
//!
//! Driver-agnostic: the engine only sees an operation returning
//! `Result<T, E>` and a [`TransientPolicy`] deciding which `E` are worth
//! repeating. Per-engine classifiers live in `polytx-core::providers`.
//!
//! - [`backoff`]: exponential delay with multiplicative jitter
//! - [`options`]: validated [`RetryOptions`] and the [`Sleeper`] seam
//! - [`engine`]: blocking and cancellable suspending execution
//! - [`telemetry`]: [`RetryAttempt`] records and structured logging
//!
//! ```rust
//! use std::time::Duration;
//!
//! use polytx_common::resilience::{policies::AlwaysTransient, RetryExecutor, RetryOptions};
//!
//! let options = RetryOptions::builder()
//!     .max_attempts(3)
//!     .base_delay(Duration::ZERO)
//!     .max_delay(Duration::ZERO)
//!     .build()
//!     .unwrap();
//! let executor = RetryExecutor::new(options, AlwaysTransient);
//!
//! let mut calls = 0;
//! let value = executor.run(|| {
//!     calls += 1;
//!     if calls < 2 { Err("busy") } else { Ok(calls) }
//! });
//! assert_eq!(value, Ok(2));
//! ```

pub mod backoff;
pub mod constants;
pub mod engine;
pub mod error;
pub mod options;
pub mod policy;
pub mod telemetry;

pub use backoff::{Jitter, JitterFn};
pub use engine::{run, run_async, run_async_observed, run_observed, RetryExecutor};
pub use error::RetryError;
pub use options::{RetryOptions, RetryOptionsBuilder, Sleeper, SystemSleeper};
pub use policy::{policies, TransientPolicy};
pub use telemetry::{DriverCode, RetryAttempt};
