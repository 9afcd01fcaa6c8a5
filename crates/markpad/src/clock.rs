use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source injected into the session so debounce and autosave deadlines
/// can be tested by advancing a manual clock instead of sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clone-cheap via `Rc` so a test can keep a handle
/// while the session owns another.
#[derive(Clone)]
pub struct ManualClock {
    current: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            current: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.current.get()
    }
}
