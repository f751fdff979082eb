//! Retry and scope settings
//!
//! [`PolytxConfig`] is the serializable form of [`RetryOptions`] and
//! [`ScopeOptions`]. Durations are written as whole milliseconds:
//!
//! ```toml
//! [retry]
//! max_attempts = 4
//! base_delay_ms = 50
//! max_delay_ms = 2000
//!
//! [transaction]
//! isolation = "serializable"
//! prefer_ambient = false
//! ```

pub mod loader;

use std::time::Duration;

use polytx_common::duration_millis;
use polytx_common::error::CommonResult;
use polytx_common::resilience::constants::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
use polytx_common::resilience::RetryOptions;
use serde::{Deserialize, Serialize};

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};

use crate::transaction::{IsolationLevel, ScopeOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolytxConfig {
    pub retry: RetrySettings,
    pub transaction: TransactionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
    /// Randomize each delay; off gives the plain exponential schedule
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetrySettings {
    /// Validated retry options
    ///
    /// # Errors
    /// `CommonError::Config` naming the offending field when the bounds are
    /// violated.
    pub fn to_options(&self) -> CommonResult<RetryOptions> {
        let builder = RetryOptions::builder()
            .max_attempts(self.max_attempts)
            .base_delay(self.base_delay)
            .max_delay(self.max_delay);
        let builder = if self.jitter { builder } else { builder.no_jitter() };
        builder.build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionSettings {
    pub isolation: IsolationLevel,
    pub prefer_ambient: bool,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        let options = ScopeOptions::default();
        Self { isolation: options.isolation, prefer_ambient: options.prefer_ambient }
    }
}

impl TransactionSettings {
    pub fn to_scope_options(&self) -> ScopeOptions {
        ScopeOptions { isolation: self.isolation, prefer_ambient: self.prefer_ambient }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_options() {
        let config = PolytxConfig::default();
        let options = config.retry.to_options().unwrap();
        assert_eq!(options.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(options.base_delay(), DEFAULT_BASE_DELAY);
        assert_eq!(config.transaction.to_scope_options(), ScopeOptions::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PolytxConfig = toml::from_str(
            r#"
            [retry]
            base_delay_ms = 10
            jitter = false

            [transaction]
            isolation = "repeatable_read"
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.base_delay, Duration::from_millis(10));
        assert_eq!(config.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(!config.retry.jitter);
        assert_eq!(config.transaction.isolation, IsolationLevel::RepeatableRead);
        assert!(config.transaction.prefer_ambient);

        let options = config.retry.to_options().unwrap();
        assert_eq!(options.delay_for(1), Duration::from_millis(10));
        assert_eq!(options.delay_for(2), Duration::from_millis(20));
    }

    /// Validates out-of-range settings are rejected by `to_options`.
    ///
    /// Assertions:
    /// - Zero attempts is a config error.
    /// - A base delay above the max delay is a config error.
    #[test]
    fn test_invalid_settings_rejected() {
        let settings = RetrySettings { max_attempts: 0, ..RetrySettings::default() };
        assert!(settings.to_options().is_err());

        let settings = RetrySettings {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(1),
            ..RetrySettings::default()
        };
        assert!(settings.to_options().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = PolytxConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["retry"]["base_delay_ms"], 100);
        assert_eq!(json["transaction"]["isolation"], "READ COMMITTED");
        let back: PolytxConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
