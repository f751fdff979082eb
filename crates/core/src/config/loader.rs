//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when `POLYTX_RETRY_MAX_ATTEMPTS` is set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. Otherwise built-in defaults
//!
//! ## Environment Variables
//! - `POLYTX_RETRY_MAX_ATTEMPTS`: attempts including the first call (required)
//! - `POLYTX_RETRY_BASE_DELAY_MS`: delay before the first retry
//! - `POLYTX_RETRY_MAX_DELAY_MS`: cap on any single delay
//! - `POLYTX_RETRY_JITTER`: randomize delays (true/false)
//! - `POLYTX_ISOLATION_LEVEL`: scope isolation level
//! - `POLYTX_PREFER_AMBIENT`: join an active ambient transaction (true/false)
//!
//! ## File Locations
//! `polytx.toml`, `polytx.json`, `config.toml`, `config.json`, looked up in
//! the working directory, then next to the executable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use polytx_common::error::{CommonError, CommonResult};

use super::{PolytxConfig, RetrySettings, TransactionSettings};
use crate::transaction::IsolationLevel;

const CONFIG_FILE_NAMES: [&str; 4] = ["polytx.toml", "polytx.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CommonError::Config` when a source exists but cannot be read,
/// parsed or validated. Missing sources fall through to the next one.
pub fn load() -> CommonResult<PolytxConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            return Ok(config);
        }
        Err(err) => {
            tracing::debug!(error = %err, "Environment configuration unavailable, trying file");
        }
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Ok(PolytxConfig::default())
        }
    }
}

/// Load configuration from `POLYTX_*` environment variables
///
/// # Errors
/// Returns `CommonError::Config` if `POLYTX_RETRY_MAX_ATTEMPTS` is missing or
/// any variable has an invalid value.
pub fn load_from_env() -> CommonResult<PolytxConfig> {
    let defaults = PolytxConfig::default();

    let max_attempts = env_var("POLYTX_RETRY_MAX_ATTEMPTS")?
        .parse::<u32>()
        .map_err(|e| CommonError::config_field("max_attempts", format!("invalid value: {e}")))?;
    let base_delay = env_millis("POLYTX_RETRY_BASE_DELAY_MS", "base_delay")?
        .unwrap_or(defaults.retry.base_delay);
    let max_delay =
        env_millis("POLYTX_RETRY_MAX_DELAY_MS", "max_delay")?.unwrap_or(defaults.retry.max_delay);
    let jitter = env_bool("POLYTX_RETRY_JITTER", defaults.retry.jitter);

    let isolation = match std::env::var("POLYTX_ISOLATION_LEVEL") {
        Ok(raw) => raw
            .parse::<IsolationLevel>()
            .map_err(|e| CommonError::config_field("isolation", e.to_string()))?,
        Err(_) => defaults.transaction.isolation,
    };
    let prefer_ambient = env_bool("POLYTX_PREFER_AMBIENT", defaults.transaction.prefer_ambient);

    let config = PolytxConfig {
        retry: RetrySettings { max_attempts, base_delay, max_delay, jitter },
        transaction: TransactionSettings { isolation, prefer_ambient },
    };
    config.retry.to_options()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// extension (`.toml` or `.json`).
///
/// # Errors
/// Returns `CommonError::Config` if the file is missing, unreadable, in an
/// unsupported format, or holds invalid settings.
pub fn load_from_file(path: Option<PathBuf>) -> CommonResult<PolytxConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CommonError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CommonError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CommonError::config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.retry.to_options()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> CommonResult<PolytxConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid JSON format: {e}"))),
        other => Err(CommonError::config(format!("Unsupported config format: {other}"))),
    }
}

/// First existing config file in the working directory or next to the
/// executable
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }
    probe_in(&dirs)
}

fn probe_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn env_var(key: &str) -> CommonResult<String> {
    std::env::var(key)
        .map_err(|_| CommonError::config(format!("Missing required environment variable: {key}")))
}

fn env_millis(key: &str, field: &str) -> CommonResult<Option<Duration>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| CommonError::config_field(field, format!("invalid milliseconds: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::{Builder, TempDir};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 6] = [
        "POLYTX_RETRY_MAX_ATTEMPTS",
        "POLYTX_RETRY_BASE_DELAY_MS",
        "POLYTX_RETRY_MAX_DELAY_MS",
        "POLYTX_RETRY_JITTER",
        "POLYTX_ISOLATION_LEVEL",
        "POLYTX_PREFER_AMBIENT",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().unwrap();

        std::env::set_var("POLYTX_TEST_BOOL_ON", "ON");
        std::env::set_var("POLYTX_TEST_BOOL_NO", "no");
        assert!(env_bool("POLYTX_TEST_BOOL_ON", false));
        assert!(!env_bool("POLYTX_TEST_BOOL_NO", true));
        assert!(env_bool("POLYTX_TEST_BOOL_MISSING", true));

        std::env::remove_var("POLYTX_TEST_BOOL_ON");
        std::env::remove_var("POLYTX_TEST_BOOL_NO");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("POLYTX_RETRY_MAX_ATTEMPTS", "3");
        std::env::set_var("POLYTX_RETRY_BASE_DELAY_MS", "10");
        std::env::set_var("POLYTX_RETRY_MAX_DELAY_MS", "100");
        std::env::set_var("POLYTX_RETRY_JITTER", "false");
        std::env::set_var("POLYTX_ISOLATION_LEVEL", "SERIALIZABLE");
        std::env::set_var("POLYTX_PREFER_AMBIENT", "0");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(10));
        assert_eq!(config.retry.max_delay, Duration::from_millis(100));
        assert!(!config.retry.jitter);
        assert_eq!(config.transaction.isolation, IsolationLevel::Serializable);
        assert!(!config.transaction.prefer_ambient);
    }

    /// Validates environment loading failures.
    ///
    /// Assertions:
    /// - A missing required variable is a config error.
    /// - A non-numeric delay is a config error naming the field.
    /// - Settings that violate the retry bounds are rejected.
    #[test]
    fn test_load_from_env_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        assert!(matches!(load_from_env(), Err(CommonError::Config { .. })));

        std::env::set_var("POLYTX_RETRY_MAX_ATTEMPTS", "3");
        std::env::set_var("POLYTX_RETRY_BASE_DELAY_MS", "soon");
        let err = load_from_env().unwrap_err();
        assert!(matches!(err, CommonError::Config { field: Some(ref f), .. } if f == "base_delay"));

        std::env::set_var("POLYTX_RETRY_BASE_DELAY_MS", "10");
        std::env::set_var("POLYTX_RETRY_MAX_ATTEMPTS", "0");
        assert!(load_from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_load_from_file_toml_and_json() {
        let mut toml_file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(toml_file, "[retry]\nmax_attempts = 7\n\n[transaction]\nprefer_ambient = false").unwrap();
        let config = load_from_file(Some(toml_file.path().to_path_buf())).unwrap();
        assert_eq!(config.retry.max_attempts, 7);
        assert!(!config.transaction.prefer_ambient);

        let mut json_file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json_file, r#"{{"retry": {{"max_attempts": 2, "base_delay_ms": 5}}}}"#).unwrap();
        let config = load_from_file(Some(json_file.path().to_path_buf())).unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_load_from_file_errors() {
        let missing = PathBuf::from("/definitely/not/here/polytx.toml");
        assert!(load_from_file(Some(missing)).is_err());

        let mut yaml = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "retry: {{}}").unwrap();
        let err = load_from_file(Some(yaml.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));

        let mut bad = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(bad, "[retry]\nmax_attempts = \"many\"").unwrap();
        let err = load_from_file(Some(bad.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML format"));
    }

    #[test]
    fn test_probe_prefers_polytx_toml() {
        let dir = TempDir::new().unwrap();
        assert!(probe_in(&[dir.path().to_path_buf()]).is_none());

        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("polytx.toml"), "").unwrap();
        let found = probe_in(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(found.file_name().unwrap(), "polytx.toml");
    }
}
