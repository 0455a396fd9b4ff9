//! Bounded retry with exponential backoff

use std::future::Future;
use std::time::Duration;

use log::debug;

use super::FetchError;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied per further retry
    pub multiplier: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the specified max attempts and default backoff
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (1-based); zero for attempt 0
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32 - 1);
        Duration::from_millis(base.min(self.max_delay.as_millis() as f64) as u64)
    }

    /// Runs `f`, retrying transient failures until attempts run out
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    debug!("Attempt {} failed: {}; retrying after {:?}", attempt, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
