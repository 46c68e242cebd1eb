//! Exponential cool-down with jitter for airports whose configuration failed.
//!
//! Keeps a sustained outage of the config source from turning every rescan
//! into a fetch attempt.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    failures: u32,
    retry_at: Instant,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
            failures: 0,
            retry_at: Instant::now(),
        }
    }

    /// True once the cool-down after the last failure has elapsed.
    pub fn ready(&self) -> bool {
        Instant::now() >= self.retry_at
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a failure; the first one waits `base`, later ones double up to `max`.
    pub fn fail(&mut self) -> Duration {
        if self.failures > 0 {
            self.current = self.current.saturating_mul(2).min(self.max);
        }
        self.failures = self.failures.saturating_add(1);
        let delay = with_jitter(self.current);
        self.retry_at = Instant::now() + delay;
        delay
    }
}

/// Adds up to 20% so airports that failed together do not retry together.
fn with_jitter(delay: Duration) -> Duration {
    let span_ms = (delay.as_millis() / 5) as u64;
    if span_ms == 0 {
        return delay;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    delay + Duration::from_millis(nanos % (span_ms + 1))
}
