//! A time interface that can be replaced by a fake time implementation
//! during testing.
//!
//! The resolver only needs a monotonic clock counting from some epoch of
//! its own. Expiry and deletion times of cached records are whole seconds
//! relative to that epoch. Retransmit deadlines use the full precision.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

//------------ Clock -----------------------------------------------------------

/// A monotonic clock.
pub trait Clock: Send + Sync {
    /// Returns the time that has passed since the clock’s epoch.
    fn elapsed(&self) -> Duration;

    /// Returns the whole seconds since the clock’s epoch.
    fn now_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

//------------ SystemClock -----------------------------------------------------

/// Implementation of the [Clock] trait using the Instant type from
/// std::time.
///
/// The epoch is the moment the clock was created.
#[derive(Clone, Debug)]
pub struct SystemClock {
    /// The epoch.
    start: Instant,
}

impl SystemClock {
    /// Creates a new clock starting now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
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
        self.start.elapsed()
    }
}

//------------ FakeClock -----------------------------------------------------

/// Implementation of the [Clock] trait to fake the passing of time, for
/// example for testing.
///
/// Clones share the same time, so a test can keep one and hand the other
/// to the resolver.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    /// The current fake time in microseconds.
    now: Arc<AtomicU64>,
}

impl FakeClock {
    /// Creates a new fake clock at its epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the current time by adding a [Duration]
    pub fn adjust_time(&self, adjust: Duration) {
        let micros = u64::try_from(adjust.as_micros()).unwrap_or(u64::MAX);
        self.now.fetch_add(micros, Ordering::Relaxed);
    }
}

impl Clock for FakeClock {
    fn elapsed(&self) -> Duration {
        Duration::from_micros(self.now.load(Ordering::Relaxed))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_clock_is_shared() {
        let clock = FakeClock::new();
        let other = clock.clone();
        assert_eq!(other.now_secs(), 0);
        clock.adjust_time(Duration::from_millis(1500));
        assert_eq!(other.elapsed(), Duration::from_millis(1500));
        assert_eq!(other.now_secs(), 1);
    }
}
