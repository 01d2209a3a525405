use std::time::Duration;

use tracing::{debug, warn};

use super::executor::TransitionError;
use crate::config::RetryConfig;

/// Caller-side retry for transient store failures.
///
/// The transition executor never retries on its own; request handlers wrap their call in
/// this policy so a timed-out write is re-validated from scratch on the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }

    pub async fn run<T, F>(&self, description: &str, mut operation: F) -> Result<T, TransitionError>
    where
        F: FnMut() -> Result<T, TransitionError>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "Processing {} (attempt {}/{})",
                description, attempt, self.max_attempts
            );

            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        "Retrying {} (attempt {}/{}) after {:?}: {}",
                        description, attempt, self.max_attempts, backoff, err
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INITIAL_BACKOFF)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
        )
    }
}
