use crate::QueueError;

/// Configuration for [`ConcurrentQueue`](crate::ConcurrentQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Logical capacity: the most elements that may be in flight at once.
    pub capacity: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            enable_metrics,
        }
    }

    /// Sets the logical capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enables or disables metrics collection.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Physical slot count: the smallest power of two `>= capacity`.
    ///
    /// Slots beyond `capacity` are slack. They exist so that indexing is a
    /// bitwise AND and are never counted as usable capacity.
    #[inline]
    pub const fn buffer_size(&self) -> usize {
        self.capacity.next_power_of_two()
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.buffer_size() - 1
    }

    /// Checks that the configuration can back a queue.
    pub fn validate(&self) -> Result<(), QueueError> {
        // Cursor distances are u64; anything above that (or the largest power
        // of two a usize can hold) cannot be rounded up safely.
        if self.capacity == 0 || self.capacity > (usize::MAX >> 1) + 1 {
            return Err(QueueError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            enable_metrics: false,
        }
    }
}

/// Low latency configuration (256 slots, fits in L1 cache for small `T`)
pub const LOW_LATENCY_CONFIG: Config = Config::new(256, false);

/// High throughput configuration (64K slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(1 << 16, false);
