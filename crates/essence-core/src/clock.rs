//! Time sources for the engine.
//!
//! All timestamps are seconds since the Unix epoch as `f64`. The engine only
//! ever asks a [`Clock`] for "now"; catch-up and live ticking derive elapsed
//! time from differences between readings.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Wall-clock anchored, monotonic afterwards.
///
/// The wall time is read once at construction; later readings add the
/// monotonic [`Instant`] delta, so adjusting the system clock while the game
/// runs cannot move time backwards or jump it forwards.
#[derive(Debug, Clone)]
pub struct SystemClock {
    wall_anchor: f64,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let wall_anchor = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            wall_anchor,
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.wall_anchor + self.anchor.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    /// Move forward by `secs`; negative values move the clock back, which
    /// is how tests simulate a tampered system clock.
    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(100.0);
        let handle = clock.clone();
        handle.advance(25.0);
        assert_eq!(clock.now(), 125.0);
        clock.set(10.0);
        assert_eq!(handle.now(), 10.0);
    }

    #[test]
    fn test_system_clock_never_goes_backwards() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a > 1.0e9);
    }
}
