//! Error types for queue operations.

use thiserror::Error;

/// Errors surfaced by queue operations.
///
/// A full queue on `offer` and an empty queue on `poll` are *not* errors; those
/// paths hand back `Err(element)` / `None` so the caller can retry, block or
/// drop. The variants here are for operations that promise a value or success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Capacity must be at least one.
    #[error("capacity must be at least 1 (got {capacity})")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// An absent element was passed to an enqueue operation.
    #[error("cannot enqueue an absent element")]
    NullElement,

    /// The queue is at capacity.
    #[error("queue is full")]
    Full,

    /// `remove()` or `element()` on an empty queue.
    #[error("queue is empty")]
    NoSuchElement,

    /// A bulk collection operation this queue does not provide.
    #[error("operation `{operation}` is not supported by this queue")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// A bounded wait elapsed before the operation could complete.
    #[error("timed out waiting on queue")]
    Timeout,

    /// A bounded wait was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("wait on queue was cancelled")]
    Cancelled,
}

impl QueueError {
    /// Returns `true` if retrying the same call later may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full | Self::Timeout)
    }

    /// Returns `true` if retrying can never succeed.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvalidCapacity { .. } | Self::Unsupported { .. } | Self::NullElement
        )
    }
}

/// Failure of a bounded or cancellable enqueue. Hands the element back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OfferWaitError<T> {
    /// The deadline passed while the queue stayed full.
    #[error("timed out waiting for queue capacity")]
    Timeout(T),
    /// The wait was cancelled while the queue stayed full.
    #[error("wait for queue capacity was cancelled")]
    Cancelled(T),
}

impl<T> OfferWaitError<T> {
    /// Recovers the element that could not be enqueued.
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(item) | Self::Cancelled(item) => item,
        }
    }

    /// Returns `true` if this was a timeout rather than a cancellation.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl<T> From<OfferWaitError<T>> for QueueError {
    fn from(err: OfferWaitError<T>) -> Self {
        match err {
            OfferWaitError::Timeout(_) => Self::Timeout,
            OfferWaitError::Cancelled(_) => Self::Cancelled,
        }
    }
}
