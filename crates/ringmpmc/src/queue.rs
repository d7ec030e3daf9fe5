use crate::invariants::{
    debug_assert_bounded_backlog, debug_assert_initialized_read, debug_assert_monotonic,
    debug_assert_not_past,
};
use crate::metrics::Metrics;
use crate::{
    Backoff, BusySpin, CancelToken, Config, MetricsSnapshot, OfferWaitError, QueueError,
    WaitStrategy,
};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// CURSOR PROTOCOL
// =============================================================================
//
// Four monotonically increasing u64 cursors. They never wrap in practice; the
// slot for a cursor value is `cursor & mask`.
//
//   released ≤ consumed ≤ committed ≤ reserved,   reserved − released ≤ capacity
//
// **Producer (offer):**
// 1. Load `released` (Acquire), then `reserved`
// 2. If `reserved − released ≥ capacity` the queue is full
// 3. CAS `reserved: r → r + 1` (AcqRel); the winner owns slot `r`
// 4. Write the element into slot `r`
// 5. Wait until `committed == r`, then store `committed = r + 1` (Release)
//
// **Consumer (poll):**
// 1. Load `consumed` (Acquire), then `committed` (Acquire)
// 2. If `consumed ≥ committed` the queue is empty
// 3. CAS `consumed: c → c + 1` (AcqRel); the winner owns slot `c`
// 4. Move the element out of slot `c`
// 5. Wait until `released == c`, then store `released = c + 1` (Release)
//
// Commits and releases advance strictly in slot order, so `committed` never
// passes a slot whose writer has not finished and `released` never passes a
// slot whose reader has not finished. Producers gate on `released`, not
// `consumed`, so a slot is never overwritten while it is still being read.
//
// Happens-before runs through the ordered hand-off: writer of slot k
// Release-stores committed = k + 1, the writer of slot k + 1 Acquire-loads it
// before its own Release store, and so on up to whatever value a consumer
// Acquire-loads.
//
// **Observers (peek, contains):**
// Set `OBSERVING` on `consumed` by CAS. While it is set no consumer can claim a
// slot, so the committed window starting at the observed cursor stays
// initialized and unmoved. Producers are unaffected. The bit is cleared by
// storing the original cursor back.
//
// =============================================================================

/// Marker bit on `consumed` while a `peek`/`contains` is reading slots.
const OBSERVING: u64 = 1 << 63;

type Slot<T> = UnsafeCell<MaybeUninit<T>>;

/// Bounded lock-free multi-producer multi-consumer queue.
///
/// Storage is a ring of `capacity.next_power_of_two()` slots; the logical
/// capacity gate, not the physical size, bounds the backlog. Any number of
/// threads may call any method concurrently.
///
/// `W` is the hook used between attempts by the blocking operations. The
/// default busy-spins.
pub struct ConcurrentQueue<T, W = BusySpin> {
    // === PRODUCER HOT ===
    /// Next slot a producer will claim
    reserved: CachePadded<AtomicU64>,
    /// Every slot below this is written and visible
    committed: CachePadded<AtomicU64>,

    // === CONSUMER HOT ===
    /// Next slot a consumer will claim (high bit: observation in progress)
    consumed: CachePadded<AtomicU64>,
    /// Every slot below this has been moved out and may be overwritten
    released: CachePadded<AtomicU64>,

    // === COLD STATE ===
    metrics: Metrics,
    config: Config,
    wait: W,

    // === DATA BUFFER ===
    buffer: Box<[Slot<T>]>,
}

// Safety: elements are only ever touched by one thread at a time (the CAS
// winner for a slot, or the single observer holding OBSERVING), so T: Send is
// enough, as with a Mutex.
unsafe impl<T: Send, W: Send> Send for ConcurrentQueue<T, W> {}
unsafe impl<T: Send, W: Sync> Sync for ConcurrentQueue<T, W> {}

impl<T> ConcurrentQueue<T> {
    /// Creates a queue holding at most `capacity` elements.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_config(Config::default().with_capacity(capacity))
    }

    /// Creates a busy-spinning queue from a full configuration.
    pub fn with_config(config: Config) -> Result<Self, QueueError> {
        Self::with_wait_strategy(config, BusySpin)
    }
}

impl<T, W: WaitStrategy> ConcurrentQueue<T, W> {
    /// Creates a queue that calls `wait` between attempts of blocking operations.
    pub fn with_wait_strategy(config: Config, wait: W) -> Result<Self, QueueError> {
        config.validate()?;

        let buffer_size = config.buffer_size();
        let buffer = (0..buffer_size)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        debug!(
            capacity = config.capacity,
            buffer_size,
            metrics = config.enable_metrics,
            "created concurrent queue"
        );

        Ok(Self {
            reserved: CachePadded::new(AtomicU64::new(0)),
            committed: CachePadded::new(AtomicU64::new(0)),
            consumed: CachePadded::new(AtomicU64::new(0)),
            released: CachePadded::new(AtomicU64::new(0)),
            metrics: Metrics::new(),
            config,
            wait,
            buffer,
        })
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Logical capacity requested at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Physical slot count (next power of two of the capacity).
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the configuration this queue was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the wait strategy used by the blocking operations.
    pub fn wait_strategy(&self) -> &W {
        &self.wait
    }

    /// Number of committed elements not yet claimed by a consumer.
    ///
    /// Weakly consistent: exact only when no other thread is operating on the
    /// queue. Do not check `len()` and then act on it; use the return values
    /// of `offer`/`poll`.
    #[inline]
    pub fn len(&self) -> usize {
        let consumed = self.consumed.load(Ordering::Acquire) & !OBSERVING;
        let committed = self.committed.load(Ordering::Acquire);
        committed.saturating_sub(consumed) as usize
    }

    /// Returns true if no committed element is waiting. Weakly consistent.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the backlog has reached capacity. Weakly consistent.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// `capacity() - len()`. Weakly consistent.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    #[inline]
    fn slot(&self, seq: u64) -> &Slot<T> {
        &self.buffer[(seq as usize) & self.config.mask()]
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Enqueues `item` without blocking.
    ///
    /// Returns `Err(item)` if the queue is at capacity; the element is handed
    /// back so the caller can retry, block or drop it.
    pub fn offer(&self, item: T) -> Result<(), T> {
        let capacity = self.capacity() as u64;
        let mut retries = 0u64;

        let (seq, released) = loop {
            // `released` first: it can only lag the `reserved` loaded after it.
            let released = self.released.load(Ordering::Acquire);
            let reserved = self.reserved.load(Ordering::Acquire);

            if reserved - released >= capacity {
                if self.config.enable_metrics {
                    self.metrics.add_offer_full();
                    self.metrics.add_producer_cas_retries(retries);
                }
                return Err(item);
            }

            match self.reserved.compare_exchange_weak(
                reserved,
                reserved + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break (reserved, released),
                Err(_) => retries += 1,
            }
        };

        debug_assert_bounded_backlog!(seq + 1, released, capacity);

        // SAFETY: winning the CAS gives this thread exclusive ownership of slot
        // `seq`. `seq - released < capacity <= buffer_size`, so the previous
        // occupant of this physical slot (seq - buffer_size) is below
        // `released`: its consumer has already moved it out, and the Acquire
        // load of `released` orders that read before this write.
        unsafe {
            (*self.slot(seq).get()).write(item);
        }

        self.commit(seq);

        if self.config.enable_metrics {
            self.metrics.add_offered(1);
            self.metrics.add_producer_cas_retries(retries);
        }

        Ok(())
    }

    /// Enqueues an element that may be absent.
    ///
    /// A present element behaves exactly like [`offer`](Self::offer): the
    /// inner result is `Err(item)` when the queue is full.
    ///
    /// # Errors
    ///
    /// [`QueueError::NullElement`] for `None`; no cursor is touched.
    pub fn offer_option(&self, item: Option<T>) -> Result<Result<(), T>, QueueError> {
        let item = item.ok_or(QueueError::NullElement)?;
        Ok(self.offer(item))
    }

    /// Like [`offer`](Self::offer) but reports a full queue as an error.
    ///
    /// The element is dropped on failure; use `offer` to get it back.
    pub fn add(&self, item: T) -> Result<(), QueueError> {
        self.offer(item).map_err(|_| QueueError::Full)
    }

    /// Publishes slot `seq` once every earlier slot has been published.
    #[inline]
    fn commit(&self, seq: u64) {
        let mut backoff = Backoff::new();
        while self.committed.load(Ordering::Acquire) != seq {
            backoff.snooze();
        }

        debug_assert_not_past!(
            "committed",
            seq + 1,
            "reserved",
            self.reserved.load(Ordering::Acquire)
        );

        self.committed.store(seq + 1, Ordering::Release);
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Dequeues the oldest committed element.
    ///
    /// Returns `None` if nothing is committed. Never waits on producers or
    /// on capacity, but does spin while another thread is inside
    /// [`peek`](Self::peek) or [`contains`](Self::contains), which includes
    /// the time spent in that thread's `Clone` or `PartialEq`.
    pub fn poll(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        let mut retries = 0u64;

        let seq = loop {
            let consumed = self.consumed.load(Ordering::Acquire);
            if consumed & OBSERVING != 0 {
                backoff.snooze();
                continue;
            }

            let committed = self.committed.load(Ordering::Acquire);
            if consumed >= committed {
                if self.config.enable_metrics {
                    self.metrics.add_poll_empty();
                    self.metrics.add_consumer_cas_retries(retries);
                }
                return None;
            }

            match self.consumed.compare_exchange_weak(
                consumed,
                consumed + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug_assert_initialized_read!(consumed, committed);
                    break consumed;
                }
                Err(_) => retries += 1,
            }
        };

        // SAFETY: winning the CAS gives this thread exclusive ownership of slot
        // `seq`, which is below `committed` and therefore fully written. It
        // stays initialized until we release it below, since producers gate on
        // `released`.
        let item = unsafe { (*self.slot(seq).get()).assume_init_read() };

        self.release(seq, 1);

        if self.config.enable_metrics {
            self.metrics.add_polled(1);
            self.metrics.add_consumer_cas_retries(retries);
        }

        Some(item)
    }

    /// Like [`poll`](Self::poll) but reports an empty queue as an error.
    pub fn remove(&self) -> Result<T, QueueError> {
        self.poll().ok_or(QueueError::NoSuchElement)
    }

    /// Hands slots `[seq, seq + n)` back to producers once every earlier slot
    /// has been handed back.
    #[inline]
    fn release(&self, seq: u64, n: u64) {
        let mut backoff = Backoff::new();
        while self.released.load(Ordering::Acquire) != seq {
            backoff.snooze();
        }

        debug_assert_not_past!(
            "released",
            seq + n,
            "consumed",
            self.consumed.load(Ordering::Acquire) & !OBSERVING
        );

        self.released.store(seq + n, Ordering::Release);
    }

    /// Drops every element committed at the time of the call.
    ///
    /// Not linearizable against concurrent producers: elements committed while
    /// `clear` runs may or may not survive it. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut backoff = Backoff::new();

        let (start, end) = loop {
            let consumed = self.consumed.load(Ordering::Acquire);
            if consumed & OBSERVING != 0 {
                backoff.snooze();
                continue;
            }

            let committed = self.committed.load(Ordering::Acquire);
            if consumed >= committed {
                return 0;
            }

            if self
                .consumed
                .compare_exchange_weak(consumed, committed, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break (consumed, committed);
            }
        };

        debug_assert_monotonic!("consumed", start, end);

        // Move everything out before releasing so a panicking Drop cannot
        // leave `released` stuck behind this range.
        let drained: Vec<T> = (start..end)
            .map(|seq| {
                debug_assert_initialized_read!(seq, end);
                // SAFETY: the CAS above claimed [start, end) for this thread;
                // every slot in it is committed and not yet released.
                unsafe { (*self.slot(seq).get()).assume_init_read() }
            })
            .collect();

        self.release(start, end - start);

        let count = drained.len();
        if self.config.enable_metrics {
            self.metrics.add_polled(count as u64);
        }
        debug!(count, "cleared concurrent queue");

        drop(drained);
        count
    }

    // ---------------------------------------------------------------------
    // OBSERVERS
    // ---------------------------------------------------------------------

    /// Freezes the consumer cursor so committed slots can be read in place.
    ///
    /// Returns `None` if there is nothing committed to observe.
    fn observe(&self) -> Option<Observation<'_, T, W>> {
        let mut backoff = Backoff::new();
        loop {
            let consumed = self.consumed.load(Ordering::Acquire);
            if consumed & OBSERVING != 0 {
                backoff.snooze();
                continue;
            }

            let committed = self.committed.load(Ordering::Acquire);
            if consumed >= committed {
                return None;
            }

            if self
                .consumed
                .compare_exchange_weak(
                    consumed,
                    consumed | OBSERVING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Some(Observation {
                    queue: self,
                    start: consumed,
                    end: committed,
                });
            }
        }
    }

    /// Returns a clone of the oldest committed element without removing it.
    ///
    /// Consumers (`poll`, `clear`, other observers) spin until `T::clone`
    /// returns. A `Clone` impl that dequeues from or observes this same
    /// queue never finishes.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        let observation = self.observe()?;
        Some(observation.get(observation.start).clone())
    }

    /// Like [`peek`](Self::peek) but reports an empty queue as an error.
    pub fn element(&self) -> Result<T, QueueError>
    where
        T: Clone,
    {
        self.peek().ok_or(QueueError::NoSuchElement)
    }

    /// Linear scan of the committed, unconsumed elements. Weakly consistent.
    ///
    /// Consumers spin for the length of the scan. A `PartialEq` impl that
    /// dequeues from or observes this same queue never finishes.
    pub fn contains(&self, needle: &T) -> bool
    where
        T: PartialEq,
    {
        self.observe().is_some_and(|observation| {
            (observation.start..observation.end).any(|seq| observation.get(seq) == needle)
        })
    }

    // ---------------------------------------------------------------------
    // BLOCKING API
    // ---------------------------------------------------------------------

    /// Enqueues `item`, waiting as long as it takes for capacity.
    pub fn put(&self, item: T) {
        let mut item = item;
        let mut backoff = self.wait.backoff();
        let mut waits = 0u64;

        loop {
            match self.offer(item) {
                Ok(()) => break,
                Err(rejected) => item = rejected,
            }
            self.wait.wait(&mut backoff, None);
            waits += 1;
        }

        if self.config.enable_metrics {
            self.metrics.add_wait_iterations(waits);
        }
    }

    /// Dequeues an element, waiting as long as it takes for one to arrive.
    pub fn take(&self) -> T {
        let mut backoff = self.wait.backoff();
        let mut waits = 0u64;

        let item = loop {
            if let Some(item) = self.poll() {
                break item;
            }
            self.wait.wait(&mut backoff, None);
            waits += 1;
        };

        if self.config.enable_metrics {
            self.metrics.add_wait_iterations(waits);
        }
        item
    }

    /// Enqueues `item`, retrying until it succeeds or `timeout` elapses.
    ///
    /// A zero timeout makes exactly one attempt. Returns `Err(item)` on
    /// timeout.
    pub fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        self.offer_deadline(item, deadline_after(timeout), None)
            .map_err(OfferWaitError::into_inner)
    }

    /// Dequeues an element, retrying until one arrives or `timeout` elapses.
    ///
    /// A zero timeout makes exactly one attempt. Returns `None` on timeout.
    pub fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        self.poll_deadline(deadline_after(timeout), None).ok()
    }

    /// Enqueues `item`, retrying until it succeeds, `deadline` passes, or
    /// `cancel` is cancelled. `None` waits without a deadline.
    ///
    /// Cancellation is checked before every attempt, the deadline after every
    /// failed attempt.
    pub fn offer_until(
        &self,
        item: T,
        deadline: Option<Instant>,
        cancel: &CancelToken,
    ) -> Result<(), OfferWaitError<T>> {
        self.offer_deadline(item, deadline, Some(cancel))
    }

    /// Dequeues an element, retrying until one arrives, `deadline` passes, or
    /// `cancel` is cancelled. `None` waits without a deadline.
    ///
    /// # Errors
    ///
    /// [`QueueError::Timeout`] or [`QueueError::Cancelled`].
    pub fn poll_until(
        &self,
        deadline: Option<Instant>,
        cancel: &CancelToken,
    ) -> Result<T, QueueError> {
        self.poll_deadline(deadline, Some(cancel))
    }

    fn offer_deadline(
        &self,
        item: T,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), OfferWaitError<T>> {
        let mut item = item;
        let mut backoff = self.wait.backoff();
        let mut waits = 0u64;

        let outcome = loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                trace!(waits, "offer cancelled");
                break Err(OfferWaitError::Cancelled(item));
            }

            match self.offer(item) {
                Ok(()) => break Ok(()),
                Err(rejected) => item = rejected,
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                trace!(waits, "offer timed out");
                break Err(OfferWaitError::Timeout(item));
            }

            self.wait.wait(&mut backoff, deadline);
            waits += 1;
        };

        if self.config.enable_metrics {
            self.metrics.add_wait_iterations(waits);
        }
        outcome
    }

    fn poll_deadline(
        &self,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> Result<T, QueueError> {
        let mut backoff = self.wait.backoff();
        let mut waits = 0u64;

        let outcome = loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                trace!(waits, "poll cancelled");
                break Err(QueueError::Cancelled);
            }

            if let Some(item) = self.poll() {
                break Ok(item);
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                trace!(waits, "poll timed out");
                break Err(QueueError::Timeout);
            }

            self.wait.wait(&mut backoff, deadline);
            waits += 1;
        };

        if self.config.enable_metrics {
            self.metrics.add_wait_iterations(waits);
        }
        outcome
    }
}

/// `None` when the deadline is too far out to represent; that waits forever.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Holds `OBSERVING` on the consumer cursor; clears it on drop, including on
/// unwind out of a panicking `Clone` or `PartialEq`.
struct Observation<'a, T, W> {
    queue: &'a ConcurrentQueue<T, W>,
    start: u64,
    end: u64,
}

impl<T, W> Observation<'_, T, W> {
    #[inline]
    fn get(&self, seq: u64) -> &T {
        debug_assert_initialized_read!(seq, self.end);
        let slot = &self.queue.buffer[(seq as usize) & self.queue.config.mask()];
        // SAFETY: `start ≤ seq < end ≤ committed`, so the slot is written. With
        // OBSERVING set no consumer can claim it, and producers cannot reach it
        // because `released ≤ start`.
        unsafe { (*slot.get()).assume_init_ref() }
    }
}

impl<T, W> Drop for Observation<'_, T, W> {
    fn drop(&mut self) {
        self.queue.consumed.store(self.start, Ordering::Release);
    }
}

impl<T, W> Drop for ConcurrentQueue<T, W> {
    fn drop(&mut self) {
        // Drop all committed, unconsumed elements
        let consumed = *self.consumed.get_mut() & !OBSERVING;
        let committed = *self.committed.get_mut();
        let mask = self.config.mask();

        for seq in consumed..committed {
            let idx = (seq as usize) & mask;
            // SAFETY: exclusive access; [consumed, committed) is initialized.
            unsafe {
                self.buffer[idx].get_mut().assume_init_drop();
            }
        }
    }
}

impl<T, W> fmt::Debug for ConcurrentQueue<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("capacity", &self.config.capacity)
            .field("buffer_size", &self.buffer.len())
            .field("reserved", &self.reserved.load(Ordering::Relaxed))
            .field("committed", &self.committed.load(Ordering::Relaxed))
            .field("consumed", &(self.consumed.load(Ordering::Relaxed) & !OBSERVING))
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
