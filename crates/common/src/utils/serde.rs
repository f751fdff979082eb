//! Serde helpers for durations in settings files
//!
//! Retry and scope settings are written by humans in TOML or JSON, where a
//! plain integer count of milliseconds reads better than serde's default
//! `{ secs, nanos }` encoding of [`Duration`].

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `Duration` as whole milliseconds (`u64`)
///
/// ```rust
/// use std::time::Duration;
///
/// use polytx_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Backoff {
///     #[serde(with = "duration_millis")]
///     base_delay: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds, saturating at `u64::MAX`
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize milliseconds into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
