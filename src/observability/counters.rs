//! Per-minute traffic counters with lazy window reset.
//!
//! One counter per traffic class (HTTP exchanges, WebSocket upgrades).
//! An increment that observes more than 60 s since the previous
//! increment resets the count to zero before counting itself, yielding
//! an approximate requests-per-minute figure for metrics display.
//!
//! Relaxed atomics are deliberate: concurrent increments near the window
//! boundary may under- or double-count. The value is cosmetic, not an
//! accounting primitive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

const WINDOW_MS: u64 = 60_000;

/// A free-running per-minute event counter.
pub struct RateCounter {
    epoch: Instant,
    count: AtomicU64,
    last_hit_ms: AtomicU64,
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            count: AtomicU64::new(0),
            last_hit_ms: AtomicU64::new(0),
        }
    }

    /// Count one event, resetting first if the window has elapsed.
    pub fn increment(&self) {
        self.record(self.epoch.elapsed().as_millis() as u64);
    }

    /// The current in-window count.
    pub fn current(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn record(&self, now_ms: u64) {
        let last = self.last_hit_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) > WINDOW_MS {
            self.count.store(0, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        self.last_hit_ms.store(now_ms, Ordering::Relaxed);
    }
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// The two traffic-class counters polled by the metrics reporter.
#[derive(Default)]
pub struct RateCounters {
    pub http: RateCounter,
    pub websocket: RateCounter,
}

impl RateCounters {
    pub fn new() -> Self {
        Self::default()
    }
}
