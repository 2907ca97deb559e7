//! Session clock used to gate emission cadence and stamp snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send {
    /// Monotonic time since the clock's origin.
    fn elapsed(&self) -> Duration;

    /// Wall-clock time in seconds since the Unix epoch.
    fn epoch_seconds(&self) -> f64;
}

/// `Instant` for cadence. Snapshot timestamps are the wall-clock time read
/// once at construction plus monotonic elapsed time, so they never go
/// backwards when the system clock is stepped.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    epoch_origin: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            epoch_origin: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn epoch_seconds(&self) -> f64 {
        self.epoch_origin + self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
    epoch_origin: f64,
}

impl ManualClock {
    pub fn new(epoch_origin: f64) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            epoch_origin,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn epoch_seconds(&self) -> f64 {
        self.epoch_origin + self.elapsed().as_secs_f64()
    }
}
