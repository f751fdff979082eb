//! Small helpers shared by the configuration and retry modules
//!
//! - **[`serde`]**: `Duration` encodings for settings files

pub mod serde;

pub use self::serde::duration_millis;
