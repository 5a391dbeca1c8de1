use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with exponential backoff, applied uniformly to every
/// network collaborator. Non-transient errors fail on the first attempt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), with jitter so
    /// parallel workers don't hammer a provider in lockstep.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff =
            self.base_delay_ms as f64 * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let jitter = fastrand::u64(0..=self.base_delay_ms.max(1));
        Duration::from_millis(backoff as u64 + jitter)
    }

    pub async fn run<T, F, Fut>(&self, label: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
