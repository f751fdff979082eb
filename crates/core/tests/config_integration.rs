//! Integration tests for settings loading
//!
//! Settings files are written to temporary directories and fed through the
//! loader into retry options and scope options.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use polytx_common::error::CommonError;
use polytx_common::testing::RecordingSleeper;
use polytx_core::config::{self, PolytxConfig};
use polytx_core::providers::{DriverError, ProviderKind, ProviderRetry};
use polytx_core::transaction::{IsolationLevel, TransactionScope};
use tempfile::Builder;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Validates a TOML file drives both the retry schedule and the scope.
///
/// Assertions:
/// - Unjittered delays follow the configured base and cap.
/// - The scope picks up the configured isolation level.
#[test]
fn toml_settings_drive_retry_and_scope() -> anyhow::Result<()> {
    let mut file = Builder::new().suffix(".toml").tempfile()?;
    write!(
        file,
        r#"
[retry]
max_attempts = 4
base_delay_ms = 25
max_delay_ms = 60
jitter = false

[transaction]
isolation = "SERIALIZABLE"
prefer_ambient = false
"#
    )?;

    let settings = config::load_from_file(Some(file.path().to_path_buf()))?;
    let sleeper = Arc::new(RecordingSleeper::new());
    let options = settings.retry.to_options()?.with_sleeper(sleeper.clone());
    let retry = ProviderRetry::new(ProviderKind::MySql, options);

    let result: Result<(), DriverError> =
        retry.run(|| Err(DriverError::numeric(ProviderKind::MySql, 1213, "deadlock")));
    assert!(result.is_err());
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(25), Duration::from_millis(50), Duration::from_millis(60)]
    );

    let scope = TransactionScope::new(settings.transaction.to_scope_options());
    assert_eq!(scope.options().isolation, IsolationLevel::Serializable);
    assert!(!scope.options().prefer_ambient);
    Ok(())
}

#[test]
fn json_settings_with_invalid_bounds_are_rejected() -> anyhow::Result<()> {
    let mut file = Builder::new().suffix(".json").tempfile()?;
    write!(file, r#"{{"retry": {{"max_attempts": 500}}}}"#)?;

    let err = config::load_from_file(Some(file.path().to_path_buf())).expect_err("too many attempts");
    assert!(matches!(err, CommonError::Config { field: Some(ref f), .. } if f == "max_attempts"));
    Ok(())
}

#[test]
fn environment_takes_precedence() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("POLYTX_RETRY_MAX_ATTEMPTS", "2");
    std::env::set_var("POLYTX_ISOLATION_LEVEL", "snapshot");

    let loaded = config::load();

    std::env::remove_var("POLYTX_RETRY_MAX_ATTEMPTS");
    std::env::remove_var("POLYTX_ISOLATION_LEVEL");

    let loaded = loaded.expect("environment configuration");
    assert_eq!(loaded.retry.max_attempts, 2);
    assert_eq!(loaded.transaction.isolation, IsolationLevel::Snapshot);
    assert_eq!(loaded.retry.base_delay, PolytxConfig::default().retry.base_delay);
}
