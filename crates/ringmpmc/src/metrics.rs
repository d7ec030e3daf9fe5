use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters, only updated when `Config::enable_metrics` is set.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    offered: AtomicU64,
    offer_full: AtomicU64,
    polled: AtomicU64,
    poll_empty: AtomicU64,
    producer_cas_retries: AtomicU64,
    consumer_cas_retries: AtomicU64,
    wait_iterations: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_offered(&self, n: u64) {
        self.offered.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_offer_full(&self) {
        self.offer_full.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_polled(&self, n: u64) {
        self.polled.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_poll_empty(&self) {
        self.poll_empty.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_producer_cas_retries(&self, n: u64) {
        if n > 0 {
            self.producer_cas_retries.fetch_add(n, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_consumer_cas_retries(&self, n: u64) {
        if n > 0 {
            self.consumer_cas_retries.fetch_add(n, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_wait_iterations(&self, n: u64) {
        if n > 0 {
            self.wait_iterations.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            offered: self.offered.load(Ordering::Relaxed),
            offer_full: self.offer_full.load(Ordering::Relaxed),
            polled: self.polled.load(Ordering::Relaxed),
            poll_empty: self.poll_empty.load(Ordering::Relaxed),
            producer_cas_retries: self.producer_cas_retries.load(Ordering::Relaxed),
            consumer_cas_retries: self.consumer_cas_retries.load(Ordering::Relaxed),
            wait_iterations: self.wait_iterations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Elements successfully enqueued.
    pub offered: u64,
    /// Non-blocking enqueues rejected because the queue was full.
    pub offer_full: u64,
    /// Elements dequeued (including those dropped by `clear`).
    pub polled: u64,
    /// Non-blocking dequeues that found the queue empty.
    pub poll_empty: u64,
    /// Lost `reserved` CAS races.
    pub producer_cas_retries: u64,
    /// Lost `consumed` CAS races.
    pub consumer_cas_retries: u64,
    /// Wait-hook invocations made by blocking operations.
    pub wait_iterations: u64,
}
