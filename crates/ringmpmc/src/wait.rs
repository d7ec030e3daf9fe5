//! Wait strategies for the blocking queue operations.
//!
//! `put`, `take` and the timed/cancellable variants never block on a wait
//! queue. They retry the non-blocking primitive and call a [`WaitStrategy`]
//! between failed attempts. The strategy only decides *how* the caller burns
//! time; the retry-until-success-or-deadline contract lives in the queue.

use crate::Backoff;
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Hook invoked between failed attempts of a blocking operation.
pub trait WaitStrategy: Send + Sync {
    /// Backoff state for one blocking call. Created once per call.
    fn backoff(&self) -> Backoff {
        Backoff::new()
    }

    /// Waits a little before the next attempt.
    ///
    /// `deadline` is the caller's deadline, if any; implementations must not
    /// sleep past it.
    fn wait(&self, backoff: &mut Backoff, deadline: Option<Instant>);
}

/// Pure busy-spin. Lowest latency, burns a core while blocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpin;

impl WaitStrategy for BusySpin {
    #[inline]
    fn wait(&self, _backoff: &mut Backoff, _deadline: Option<Instant>) {
        hint::spin_loop();
    }
}

/// Spin with exponential PAUSE runs, then yield to the OS scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldingWait;

impl WaitStrategy for YieldingWait {
    #[inline]
    fn wait(&self, backoff: &mut Backoff, _deadline: Option<Instant>) {
        backoff.snooze();
    }
}

/// Spin → yield → park with a timeout.
///
/// Nothing unparks the thread; `park_timeout` is used as a bounded sleep that
/// also wakes early on a stray `unpark`. The sleep is clipped to the deadline.
#[derive(Debug, Clone, Copy)]
pub struct ParkingWait {
    park_interval: Duration,
}

impl ParkingWait {
    /// Parks for at most `park_interval` per wait once spinning and yielding
    /// are exhausted.
    pub const fn new(park_interval: Duration) -> Self {
        Self { park_interval }
    }

    /// Returns the configured park interval.
    pub const fn park_interval(&self) -> Duration {
        self.park_interval
    }
}

impl Default for ParkingWait {
    fn default() -> Self {
        Self::new(Duration::from_micros(100))
    }
}

impl WaitStrategy for ParkingWait {
    fn wait(&self, backoff: &mut Backoff, deadline: Option<Instant>) {
        if !backoff.is_completed() {
            backoff.snooze();
            return;
        }

        let park_for = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                remaining.min(self.park_interval)
            }
            None => self.park_interval,
        };
        if !park_for.is_zero() {
            thread::park_timeout(park_for);
        }
    }
}

/// Cooperative cancellation flag shared between a waiting caller and whoever
/// wants to stop it.
///
/// Checked at every retry iteration of `offer_until` / `poll_until`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
