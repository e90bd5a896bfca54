// src/api/rate_limit.rs
//! Minimum spacing between outgoing requests.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// One shared clock per instance.
///
/// The lock is held across the sleep, so concurrent callers queue up and
/// each call start lands at least `min_interval` after the previous one.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Waits until the next request may start, then claims the slot.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                log::trace!("Rate limiting: waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(
            crate::constants::DEFAULT_MIN_REQUEST_INTERVAL_MS,
        ))
    }
}
