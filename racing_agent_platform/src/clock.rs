//! Time source for the real-time loop.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time plus a blocking wait.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block the calling thread until `deadline`; returns at once if it has
    /// already passed.
    fn sleep_until(&self, deadline: Instant);

    fn sleep(&self, duration: Duration) {
        self.sleep_until(self.now() + duration);
    }
}

/// Wall-clock time, `std::thread::sleep` for waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Virtual time: sleeping jumps the clock forward instead of blocking.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Instant) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep_until(&self, deadline: Instant) {
        (**self).sleep_until(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_forward() {
        let start = Instant::now();
        let clock = ManualClock::new(start);
        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));

        clock.sleep_until(start);
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn system_clock_past_deadline_returns_immediately() {
        let clock = SystemClock;
        let before = Instant::now();
        clock.sleep_until(before);
        assert!(before.elapsed() < Duration::from_millis(50));
    }
}
