//! Exponential backoff with multiplicative jitter
//!
//! `candidate = base_delay * 2^(attempt - 1)`, clamped to `max_delay`, then
//! `candidate * (1 + jitter(attempt))`, clamped again. Jitter factors are
//! half-open in `[0, 1)`, so jitter only ever lengthens a delay and never
//! pushes it past the cap.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::constants::{MAX_BACKOFF_EXPONENT, MAX_JITTER_FACTOR};
use super::options::RetryOptions;

/// Type alias for a jitter factor provider keyed by attempt number
pub type JitterFn = Arc<dyn Fn(u32) -> f64 + Send + Sync>;

/// Source of the jitter factor applied to each backoff delay
#[derive(Default)]
pub enum Jitter {
    /// Factor is always zero; delays are exact powers of two of the base
    None,
    /// Factor drawn uniformly from `[0, 1)` on every call
    #[default]
    Random,
    /// Caller-supplied factor, typically a constant in tests
    Custom(JitterFn),
}

impl Clone for Jitter {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Random => Self::Random,
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl fmt::Debug for Jitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Random => write!(f, "Random"),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

impl Jitter {
    /// Wrap a closure as a jitter provider
    pub fn custom<F>(provider: F) -> Self
    where
        F: Fn(u32) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(provider))
    }

    /// Jitter factor for `attempt`, sanitised into `[0, 1)`
    pub fn factor(&self, attempt: u32) -> f64 {
        let raw = match self {
            Self::None => 0.0,
            Self::Random => rand::thread_rng().gen::<f64>(),
            Self::Custom(provider) => provider(attempt),
        };
        sanitize_factor(raw)
    }
}

fn sanitize_factor(raw: f64) -> f64 {
    if raw.is_nan() || raw <= 0.0 {
        0.0
    } else {
        raw.min(MAX_JITTER_FACTOR)
    }
}

/// Delay before retrying after failed attempt `attempt` (1-based)
pub fn delay(attempt: u32, options: &RetryOptions) -> Duration {
    let candidate = exponential_delay(attempt, options.base_delay(), options.max_delay());
    apply_jitter(candidate, options.jitter().factor(attempt), options.max_delay())
}

/// Un-jittered exponential delay, clamped to `max_delay`
pub fn exponential_delay(attempt: u32, base_delay: Duration, max_delay: Duration) -> Duration {
    // Cap exponent to prevent overflow
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base_delay.saturating_mul(1_u32 << exponent).min(max_delay)
}

/// Stretch `candidate` by `1 + factor`, never exceeding `max_delay`
pub fn apply_jitter(candidate: Duration, factor: f64, max_delay: Duration) -> Duration {
    let candidate = candidate.min(max_delay);
    if factor <= 0.0 {
        return candidate;
    }

    let stretched = candidate.as_nanos() as f64 * (1.0 + factor);
    if stretched >= max_delay.as_nanos() as f64 {
        return max_delay;
    }
    Duration::from_nanos(stretched as u64)
}
