use std::hint;
use std::thread;

/// Adaptive backoff strategy (Crossbeam-style).
///
/// Progressively increases wait time: spin with PAUSE → yield to OS.
/// Used internally while a producer waits for its commit turn or a consumer
/// waits for its release turn, and by [`YieldingWait`](crate::YieldingWait) /
/// [`ParkingWait`](crate::ParkingWait) between retries.
#[derive(Debug, Clone)]
pub struct Backoff {
    step: u32,
    spin_limit: u32,
    yield_limit: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10;

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self::with_limits(Self::SPIN_LIMIT, Self::YIELD_LIMIT)
    }

    /// Creates a backoff that spins for `spin_limit` steps and yields until
    /// `yield_limit` steps before reporting completion.
    #[inline]
    pub fn with_limits(spin_limit: u32, yield_limit: u32) -> Self {
        Self {
            step: 0,
            spin_limit,
            yield_limit: yield_limit.max(spin_limit),
        }
    }

    /// Light spin with PAUSE hints.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1u32 << self.step.min(self.spin_limit).min(31);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= self.spin_limit {
            self.step += 1;
        }
    }

    /// Heavier backoff: spin then yield.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= self.spin_limit {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= self.yield_limit {
                self.step += 1;
            }
        }
    }

    /// True once spinning and yielding have both been exhausted.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > self.yield_limit
    }

    /// Current step, for strategies that escalate past yielding.
    #[inline]
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
