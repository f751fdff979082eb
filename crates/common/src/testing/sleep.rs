//! Sleeper double for retry tests
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use polytx_common::resilience::Sleeper;
//! use polytx_common::testing::RecordingSleeper;
//!
//! let sleeper = Arc::new(RecordingSleeper::new());
//! sleeper.sleep(Duration::from_millis(10));
//! assert_eq!(sleeper.delays(), vec![Duration::from_millis(10)]);
//! ```

use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::resilience::Sleeper;

/// Records every requested delay
///
/// By default returns immediately. [`RecordingSleeper::real_time`] also
/// sleeps for real, which cancellation tests need so a token can fire while
/// the engine is waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
    real: bool,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn real_time() -> Self {
        Self { delays: Mutex::new(Vec::new()), real: true }
    }

    /// Delays requested so far, in call order
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.delays.lock().len()
    }

    pub fn total(&self) -> Duration {
        self.delays.lock().iter().sum()
    }

    pub fn clear(&self) {
        self.delays.lock().clear();
    }

    fn record(&self, delay: Duration) {
        self.delays.lock().push(delay);
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) {
        self.record(delay);
        if self.real {
            std::thread::sleep(delay);
        }
    }

    fn sleep_async(&self, delay: Duration) -> BoxFuture<'static, ()> {
        self.record(delay);
        if self.real {
            Box::pin(tokio::time::sleep(delay))
        } else {
            Box::pin(std::future::ready(()))
        }
    }
}
