//! RingMPMC - Bounded Lock-Free Multi-Producer Multi-Consumer Queue
//!
//! A fixed-capacity queue on a power-of-two ring buffer. Producers and
//! consumers coordinate only through monotonically increasing `u64` cursors
//! (reserve → commit on the producer side, consume → release on the consumer
//! side) using compare-and-swap; there is no mutex anywhere.
//!
//! # Key Features
//!
//! - Any number of producers and consumers (true MPMC)
//! - Logical capacity independent of the power-of-two slot count
//! - Cache-padded cursors (`crossbeam_utils::CachePadded`)
//! - Blocking, timed and cancellable variants over a pluggable [`WaitStrategy`]
//! - Bulk collection operations explicitly rejected via [`BulkOps`]
//!
//! Ordering: elements become visible in commit order, which is slot order.
//! A single producer and single consumer therefore see strict FIFO; with
//! several producers there is no global FIFO across their submissions.
//!
//! # Example
//!
//! ```
//! use ringmpmc_rs::{ConcurrentQueue, QueueError};
//! use std::time::Duration;
//!
//! let queue = ConcurrentQueue::<u64>::new(4)?;
//!
//! // Non-blocking: a full queue hands the element back
//! for i in 0..4 {
//!     queue.offer(i).unwrap();
//! }
//! assert_eq!(queue.offer(99), Err(99));
//!
//! assert_eq!(queue.peek(), Some(0));
//! assert_eq!(queue.poll(), Some(0));
//!
//! // Bounded wait
//! assert!(queue.offer_timeout(4, Duration::from_millis(10)).is_ok());
//! assert_eq!(queue.len(), 4);
//! # Ok::<(), QueueError>(())
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod metrics;
mod queue;
mod traits;
mod wait;

pub use backoff::Backoff;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{OfferWaitError, QueueError};
pub use metrics::MetricsSnapshot;
pub use queue::ConcurrentQueue;
pub use traits::{BlockingQueue, BulkOps, PeekableQueue, Queue};
pub use wait::{BusySpin, CancelToken, ParkingWait, WaitStrategy, YieldingWait};
