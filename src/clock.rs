//! Time source for the cache tiers.
//!
//! Every TTL decision reads the current instant through a [`Clock`] so the
//! expiry rules can be exercised with simulated time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Source of the current wall-clock instant.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Create a clock frozen at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now = offset(*now, by);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// `at + by`, saturating at the maximum representable instant.
pub fn offset(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time elapsed from `since` to `now`; zero when `since` lies in the future.
pub fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(90));
        assert_eq!(elapsed(start, clock.now()), Duration::from_secs(90));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let now = Utc::now();
        let later = offset(now, Duration::from_secs(10));
        assert_eq!(elapsed(later, now), Duration::ZERO);
    }

    #[test]
    fn test_offset_saturates() {
        let now = Utc::now();
        assert_eq!(offset(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
