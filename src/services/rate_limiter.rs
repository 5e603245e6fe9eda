use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between outbound requests to one upstream host
///
/// Callers reserve the next free slot under a FIFO mutex and then sleep outside of it,
/// so concurrent callers are spaced by `delay` without holding the lock while waiting.
/// Upper bound on the configured spacing
pub const MAX_DELAY: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        if delay > MAX_DELAY {
            tracing::warn!(
                delay_ms = delay.as_millis() as u64,
                max_delay_ms = MAX_DELAY.as_millis() as u64,
                "Rate limit delay clamped"
            );
        }

        Self {
            delay: delay.min(MAX_DELAY),
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until at least `delay` has passed since the previous caller was released
    ///
    /// A caller that stops awaiting after reserving still consumes its slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut last = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => previous
                    .checked_add(self.delay)
                    .unwrap_or(previous)
                    .max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limiting scrape request");
            tokio::time::sleep_until(slot).await;
        }
    }
}
