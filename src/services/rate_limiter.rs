use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Minimum spacing between requests, shared by every caller
///
/// Callers that arrive too early wait for their slot instead of failing.
/// The lock is held across the wait, so callers are admitted one at a time
/// in arrival order.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until a request may be sent, then claim the slot
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                debug!(wait_ms = (ready_at - now).as_millis() as u64, "Rate limit spacing, waiting");
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}
