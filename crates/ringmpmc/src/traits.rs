//! Queue capability traits.
//!
//! A small trait set instead of a full collection interface: what the queue
//! can honor lives in [`Queue`], [`PeekableQueue`] and [`BlockingQueue`]; the
//! bulk operations it cannot honor live in [`BulkOps`], whose every method
//! fails with [`QueueError::Unsupported`].

use crate::{ConcurrentQueue, QueueError, WaitStrategy};
use std::time::Duration;

/// Non-blocking enqueue/dequeue.
pub trait Queue<T> {
    /// Enqueues without blocking; hands the element back if full.
    fn offer(&self, item: T) -> Result<(), T>;

    /// Dequeues without blocking; `None` if empty.
    fn poll(&self) -> Option<T>;

    /// Weakly consistent element count.
    fn len(&self) -> usize;

    /// Logical capacity.
    fn capacity(&self) -> usize;

    /// [`offer`](Self::offer) with a full queue reported as [`QueueError::Full`].
    fn add(&self, item: T) -> Result<(), QueueError> {
        self.offer(item).map_err(|_| QueueError::Full)
    }

    /// [`poll`](Self::poll) with an empty queue reported as
    /// [`QueueError::NoSuchElement`].
    fn remove(&self) -> Result<T, QueueError> {
        self.poll().ok_or(QueueError::NoSuchElement)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remaining_capacity(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }
}

/// Reading the head without removing it.
pub trait PeekableQueue<T: Clone>: Queue<T> {
    /// Clone of the oldest element, or `None` if empty.
    fn peek(&self) -> Option<T>;

    /// [`peek`](Self::peek) with an empty queue reported as
    /// [`QueueError::NoSuchElement`].
    fn element(&self) -> Result<T, QueueError> {
        self.peek().ok_or(QueueError::NoSuchElement)
    }
}

/// Retry-until-success operations.
pub trait BlockingQueue<T>: Queue<T> {
    /// Enqueues, waiting for capacity without bound.
    fn put(&self, item: T);

    /// Dequeues, waiting for an element without bound.
    fn take(&self) -> T;

    /// Enqueues, giving up with `Err(item)` once `timeout` elapses.
    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T>;

    /// Dequeues, giving up with `None` once `timeout` elapses.
    fn poll_timeout(&self, timeout: Duration) -> Option<T>;
}

#[inline]
fn unsupported<R>(operation: &'static str) -> Result<R, QueueError> {
    Err(QueueError::Unsupported { operation })
}

/// Bulk collection operations the queue explicitly does not support.
///
/// Every method fails with [`QueueError::Unsupported`] without touching the
/// queue. They exist so callers get a clear error instead of silently
/// inheriting behavior that cannot be honored under concurrency.
pub trait BulkOps<T> {
    #[allow(clippy::iter_not_returning_iterator)]
    fn iter(&self) -> Result<std::vec::IntoIter<T>, QueueError> {
        unsupported("iter")
    }

    fn to_vec(&self) -> Result<Vec<T>, QueueError> {
        unsupported("to_vec")
    }

    fn contains_all(&self, _items: &[T]) -> Result<bool, QueueError> {
        unsupported("contains_all")
    }

    fn add_all<I>(&self, _items: I) -> Result<bool, QueueError>
    where
        I: IntoIterator<Item = T>,
    {
        unsupported("add_all")
    }

    fn remove_all(&self, _items: &[T]) -> Result<bool, QueueError> {
        unsupported("remove_all")
    }

    fn retain_all(&self, _items: &[T]) -> Result<bool, QueueError> {
        unsupported("retain_all")
    }

    fn remove_item(&self, _item: &T) -> Result<bool, QueueError> {
        unsupported("remove_item")
    }

    fn drain_to<E>(&self, _sink: &mut E) -> Result<usize, QueueError>
    where
        E: Extend<T>,
    {
        unsupported("drain_to")
    }

    fn drain_to_max<E>(&self, _sink: &mut E, _max_elements: usize) -> Result<usize, QueueError>
    where
        E: Extend<T>,
    {
        unsupported("drain_to_max")
    }
}

impl<T, W: WaitStrategy> Queue<T> for ConcurrentQueue<T, W> {
    #[inline]
    fn offer(&self, item: T) -> Result<(), T> {
        ConcurrentQueue::offer(self, item)
    }

    #[inline]
    fn poll(&self) -> Option<T> {
        ConcurrentQueue::poll(self)
    }

    #[inline]
    fn len(&self) -> usize {
        ConcurrentQueue::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        ConcurrentQueue::capacity(self)
    }
}

impl<T: Clone, W: WaitStrategy> PeekableQueue<T> for ConcurrentQueue<T, W> {
    #[inline]
    fn peek(&self) -> Option<T> {
        ConcurrentQueue::peek(self)
    }
}

impl<T, W: WaitStrategy> BlockingQueue<T> for ConcurrentQueue<T, W> {
    fn put(&self, item: T) {
        ConcurrentQueue::put(self, item);
    }

    fn take(&self) -> T {
        ConcurrentQueue::take(self)
    }

    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        ConcurrentQueue::offer_timeout(self, item, timeout)
    }

    fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        ConcurrentQueue::poll_timeout(self, timeout)
    }
}

impl<T, W> BulkOps<T> for ConcurrentQueue<T, W> {}
