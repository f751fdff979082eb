// Defaults and bounds for retry options
use std::time::Duration;

/// Default number of attempts, the first call included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default upper bound on any single backoff delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Maximum exponent for exponential backoff calculation to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Minimum allowed max_attempts value
pub const MIN_MAX_ATTEMPTS: u32 = 1;

/// Maximum allowed max_attempts value
pub const MAX_MAX_ATTEMPTS: u32 = 100;

/// Largest jitter factor handed to the backoff calculation; factors are
/// half-open in `[0, 1)`
pub const MAX_JITTER_FACTOR: f64 = 1.0 - f64::EPSILON;
