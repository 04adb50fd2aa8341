//! Bounded fixed-interval polling
//!
//! Run status is observed, not driven: the service re-reads it on a fixed
//! interval until the caller's predicate accepts the value or the attempt
//! budget runs out. There is no backoff and no retry of failed reads; an
//! error from the operation ends polling immediately.
//!
//! # Examples
//!
//! ```rust,no_run
//! use layover_fuel::poll::{poll_until, PollConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> layover_fuel::Result<()> {
//! let config = PollConfig::default()
//!     .with_max_attempts(5)
//!     .with_interval(Duration::from_millis(200));
//!
//! let value = poll_until(&config, || async { Ok::<_, layover_fuel::Error>(42) }, |v| *v == 42)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for polling behavior
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of reads
    pub max_attempts: u32,

    /// Delay before each read
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    /// Create a new poll configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before each attempt
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Poll an async read until `is_done` accepts its value
///
/// Sleeps `interval` before every read. Returns the first accepted value,
/// the first error from `operation`, or [`Error::Timeout`] after
/// `max_attempts` reads.
pub async fn poll_until<F, Fut, T, P>(
    config: &PollConfig,
    mut operation: F,
    is_done: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    for attempt in 1..=config.max_attempts {
        sleep(config.interval).await;

        let value = operation().await?;
        if is_done(&value) {
            log::debug!("Poll satisfied after {} attempt(s)", attempt);
            return Ok(value);
        }
    }

    Err(Error::timeout(config.max_attempts))
}
