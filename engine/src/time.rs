//! Time source abstraction for query execution budgets.
//!
//! Execution timeouts are measured against a [`Clock`]. Production code uses
//! [`MonotonicClock`]; tests inject a simulated clock that only advances when
//! told to, so timeout behaviour is deterministic.

use std::cell::Cell;
use std::time::Instant;

/// Abstraction over a monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Real monotonic clock, measured from its own creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[allow(clippy::cast_possible_truncation)] // Milliseconds won't overflow u64 for billions of years
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A stopwatch over a [`Clock`].
///
/// Uses interior mutability so that timeout checks (which stop the timer on
/// failure) can run while the evaluation context is only shared-borrowed.
pub struct ExecutionTimer<'a> {
    clock: Box<dyn Clock + 'a>,
    started_at: Cell<Option<u64>>,
    stopped_at: Cell<Option<u64>>,
}

impl<'a> ExecutionTimer<'a> {
    #[must_use]
    pub fn new(clock: Box<dyn Clock + 'a>) -> Self {
        Self {
            clock,
            started_at: Cell::new(None),
            stopped_at: Cell::new(None),
        }
    }

    /// Start (or restart) the timer.
    pub fn start(&self) {
        self.started_at.set(Some(self.clock.now_ms()));
        self.stopped_at.set(None);
    }

    /// Stop the timer, freezing the elapsed time. No-op if not running.
    pub fn stop(&self) {
        if self.is_running() {
            self.stopped_at.set(Some(self.clock.now_ms()));
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at.get().is_some() && self.stopped_at.get().is_none()
    }

    /// Elapsed milliseconds; zero if never started.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        let Some(started_at) = self.started_at.get() else {
            return 0;
        };
        let end = self
            .stopped_at
            .get()
            .unwrap_or_else(|| self.clock.now_ms());
        end.saturating_sub(started_at)
    }
}

impl std::fmt::Debug for ExecutionTimer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTimer")
            .field("started_at", &self.started_at.get())
            .field("stopped_at", &self.stopped_at.get())
            .finish_non_exhaustive()
    }
}
