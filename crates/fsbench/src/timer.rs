//! Monotonic timer used for every measurement.
//!
//! Wraps a [`quanta::Clock`], which reads a calibrated TSC where available and
//! falls back to the OS monotonic clock otherwise. Wall-clock adjustments never
//! affect a measurement.

use std::time::Duration;

/// Opaque start point returned by [`Timer::start`].
#[derive(Debug, Clone, Copy)]
pub struct TimerHandle(quanta::Instant);

/// Monotonic high-resolution timer.
#[derive(Debug, Clone)]
pub struct Timer {
    clock: quanta::Clock,
}

impl Timer {
    /// Create a timer backed by the system clock.
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
        }
    }

    /// Create a timer backed by an explicit clock (e.g. `quanta::Clock::mock()`).
    pub fn with_clock(clock: quanta::Clock) -> Self {
        Self { clock }
    }

    /// Mark the start of a timed operation.
    #[inline]
    pub fn start(&self) -> TimerHandle {
        TimerHandle(self.clock.now())
    }

    /// Time elapsed since `handle` was taken.
    #[inline]
    pub fn elapsed(&self, handle: TimerHandle) -> Duration {
        self.clock.now().saturating_duration_since(handle.0)
    }

    /// Run `f` and return its output along with how long it took.
    #[inline]
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> (T, Duration) {
        let handle = self.start();
        let out = f();
        (out, self.elapsed(handle))
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
