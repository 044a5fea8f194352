use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Time base for the playback scheduler.
///
/// Times are offsets from the clock's own origin. `wait_until` blocks until
/// the deadline passes or `stop` is raised; `wake` interrupts a waiter so it
/// re-checks `stop`.
pub trait TransportClock: Send + Sync {
    fn now(&self) -> Duration;

    /// Returns `true` once `deadline` is reached, `false` if stopped first
    fn wait_until(&self, deadline: Duration, stop: &AtomicBool) -> bool;

    fn wake(&self);
}

/// Wall-clock transport
pub struct SystemClock {
    origin: Instant,
    lock: Mutex<()>,
    signal: Condvar,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            lock: Mutex::new(()),
            signal: Condvar::new(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wait_until(&self, deadline: Duration, stop: &AtomicBool) -> bool {
        let mut guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if stop.load(Ordering::Acquire) {
                return false;
            }
            let now = self.now();
            if now >= deadline {
                return true;
            }
            guard = match self.signal.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn wake(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.signal.notify_all();
    }
}

/// Hand-driven transport for tests.
///
/// Time only moves when `advance` is called, so scheduled triggers fire
/// deterministically without sleeping.
pub struct ManualClock {
    now: Mutex<Duration>,
    signal: Condvar,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
            signal: Condvar::new(),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
        self.signal.notify_all();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn wait_until(&self, deadline: Duration, stop: &AtomicBool) -> bool {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if stop.load(Ordering::Acquire) {
                return false;
            }
            if *now >= deadline {
                return true;
            }
            now = self.signal.wait(now).unwrap_or_else(|p| p.into_inner());
        }
    }

    fn wake(&self) {
        let _now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        self.signal.notify_all();
    }
}
