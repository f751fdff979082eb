//! Test support shared by the workspace
//!
//! - **[`sleep`]**: [`RecordingSleeper`], a [`Sleeper`](crate::resilience::Sleeper)
//!   that captures backoff delays instead of waiting for them

pub mod sleep;

pub use sleep::RecordingSleeper;
