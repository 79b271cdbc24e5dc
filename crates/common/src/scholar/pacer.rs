//! Minimum-spacing request gate

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive requests.
///
/// The last request instant lives behind an async mutex that stays locked
/// while waiting, so callers sharing one pacer are served one at a time and
/// the overall cadence holds regardless of concurrency.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Create a pacer with the given minimum spacing
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Sleep until the next request may be sent, then claim the slot
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                tracing::trace!(wait_ms = remaining.as_millis() as u64, "Pacing request");
                tokio::time::sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
    }
}
