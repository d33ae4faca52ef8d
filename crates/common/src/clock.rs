//! Current-time capability.
//!
//! Time-dependent checks (token expiry) read the clock through [`Clock`]
//! so that boundary conditions can be tested without wall-clock dependence.

#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time in Unix epoch seconds.
pub trait Clock: Send + Sync {
    /// Current time as seconds since the Unix epoch.
    fn now_unix(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock frozen at a settable instant.
///
/// Test-only; enable the `test-utils` feature to use it from other crates.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

#[cfg(any(test, feature = "test-utils"))]
impl FixedClock {
    /// Create a clock reading `now` (Unix epoch seconds).
    #[must_use]
    pub fn at(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_tracks_chrono() {
        let before = chrono::Utc::now().timestamp();
        let now = SystemClock.now_unix();
        let after = chrono::Utc::now().timestamp();

        assert!(before <= now && now <= after);
    }

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let clock = FixedClock::at(1_700_000_000);
        assert_eq!(clock.now_unix(), 1_700_000_000);

        clock.advance(60);
        assert_eq!(clock.now_unix(), 1_700_000_060);

        clock.set(5);
        assert_eq!(clock.now_unix(), 5);
    }

    #[test]
    fn test_clock_is_object_safe() {
        let clock: Box<dyn Clock> = Box::new(FixedClock::at(42));
        assert_eq!(clock.now_unix(), 42);
    }
}
