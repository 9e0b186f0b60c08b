#![deny(missing_docs)]
//! Time source shims for the polling loops.
//!
//! Both mailbox loops are fixed-interval pollers. They read time and sleep
//! only through [`Clock`], so the same code runs against the wall clock in
//! production ([`SystemClock`]) and against virtual time in tests
//! ([`ManualClock`]), where a sleep advances time instantly and can drive a
//! simulated peer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic time source with a blocking sleep.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Blocks the caller for `duration`.
    fn sleep(&self, duration: Duration);
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall-clock time backed by [`Instant`] and [`thread::sleep`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

type SleepHook = Box<dyn Fn(Duration) + Send + Sync>;

#[derive(Default)]
struct ManualState {
    now: Mutex<Duration>,
    sleeps: AtomicU64,
    hooks: Mutex<Vec<SleepHook>>,
}

/// Virtual clock for deterministic tests. Clones share the same time.
///
/// `sleep` advances time by the requested amount and returns immediately,
/// then runs every registered hook with the new time. Hooks stand in for the
/// other side of the mailbox acting while the caller waits. A hook must not
/// call `sleep` on the same clock.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Arc<ManualState>,
}

impl ManualClock {
    /// Creates a clock at time zero with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward without running hooks.
    pub fn advance(&self, duration: Duration) {
        *self.state.now.lock() += duration;
    }

    /// Number of `sleep` calls observed so far.
    pub fn sleeps(&self) -> u64 {
        self.state.sleeps.load(Ordering::Relaxed)
    }

    /// Registers a hook run after every `sleep`.
    pub fn on_sleep<F>(&self, hook: F)
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.state.hooks.lock().push(Box::new(hook));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.state.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        let now = {
            let mut now = self.state.now.lock();
            *now += duration;
            *now
        };
        self.state.sleeps.fetch_add(1, Ordering::Relaxed);
        for hook in self.state.hooks.lock().iter() {
            hook(now);
        }
    }
}

/// Time budget measured on a [`Clock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    start: Duration,
    budget: Duration,
}

impl Deadline {
    /// Starts a budget of `budget` at the clock's current time.
    pub fn after<C>(clock: &C, budget: Duration) -> Self
    where
        C: Clock + ?Sized,
    {
        Self {
            start: clock.now(),
            budget,
        }
    }

    /// Total budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time spent since the deadline started.
    pub fn elapsed<C>(&self, clock: &C) -> Duration
    where
        C: Clock + ?Sized,
    {
        clock.now().saturating_sub(self.start)
    }

    /// Budget left; zero once expired.
    pub fn remaining<C>(&self, clock: &C) -> Duration
    where
        C: Clock + ?Sized,
    {
        self.budget.saturating_sub(self.elapsed(clock))
    }

    /// Whether the whole budget has been spent.
    pub fn expired<C>(&self, clock: &C) -> bool
    where
        C: Clock + ?Sized,
    {
        self.elapsed(clock) >= self.budget
    }

    /// Sleeps one poll `interval`, cut short so it never overshoots the
    /// deadline. Returns `false` without sleeping when already expired.
    pub fn pause<C>(&self, clock: &C, interval: Duration) -> bool
    where
        C: Clock + ?Sized,
    {
        let remaining = self.remaining(clock);
        if remaining.is_zero() {
            return false;
        }
        clock.sleep(interval.min(remaining));
        true
    }
}
