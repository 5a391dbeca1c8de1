use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Global send throttle: a minimum delay between outbound messages,
/// enforced across the whole batch rather than per worker. A little jitter
/// keeps the cadence from looking robotic.
#[derive(Debug)]
pub struct SendThrottle {
    min_delay: Duration,
    jitter_ms: u64,
    last_send: Mutex<Option<Instant>>,
}

impl SendThrottle {
    pub fn new(min_delay: Duration) -> Self {
        Self::with_jitter(min_delay, 1000)
    }

    pub fn with_jitter(min_delay: Duration, jitter_ms: u64) -> Self {
        Self {
            min_delay,
            jitter_ms,
            last_send: Mutex::new(None),
        }
    }

    /// Waits until the next send slot and claims it. Holding the lock across
    /// the sleep is what serializes concurrent callers.
    pub async fn acquire(&self) {
        let mut last_send = self.last_send.lock().await;
        if let Some(last) = *last_send {
            let gap = self.min_delay + Duration::from_millis(fastrand::u64(0..=self.jitter_ms));
            let ready_at = last + gap;
            let now = Instant::now();
            if ready_at > now {
                debug!("Throttling send for {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_send = Some(Instant::now());
    }
}
