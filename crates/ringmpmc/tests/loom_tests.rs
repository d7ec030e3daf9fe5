//! Loom-based concurrency tests for ringmpmc-rs.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores thread interleavings. The queue itself is built
//! on std atomics, so these tests model the same reserve/commit/consume/release
//! protocol on loom primitives with a tiny ring to keep the state space small,
//! including the `OBSERVING` bit taken by `peek` and the range claim of `clear`.
//! Slots use `loom::cell::UnsafeCell`, so any overlapping write/read of a slot
//! is reported as a data race.

#![cfg(feature = "loom")]

use loom::cell::UnsafeCell;
use loom::sync::atomic::{AtomicU64, Ordering};
use loom::sync::Arc;
use loom::thread;

const SLOTS: usize = 2;
const OBSERVING: u64 = 1 << 63;

struct LoomQueue {
    reserved: AtomicU64,
    committed: AtomicU64,
    consumed: AtomicU64,
    released: AtomicU64,
    slots: [UnsafeCell<u64>; SLOTS],
    capacity: u64,
}

unsafe impl Send for LoomQueue {}
unsafe impl Sync for LoomQueue {}

impl LoomQueue {
    fn new(capacity: u64) -> Self {
        Self {
            reserved: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            released: AtomicU64::new(0),
            slots: [UnsafeCell::new(0), UnsafeCell::new(0)],
            capacity,
        }
    }

    fn slot(&self, seq: u64) -> &UnsafeCell<u64> {
        &self.slots[(seq as usize) & (SLOTS - 1)]
    }

    fn offer(&self, value: u64) -> bool {
        let seq = loop {
            let released = self.released.load(Ordering::Acquire);
            let reserved = self.reserved.load(Ordering::Acquire);
            if reserved - released >= self.capacity {
                return false;
            }
            if self
                .reserved
                .compare_exchange(reserved, reserved + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break reserved;
            }
        };

        self.slot(seq).with_mut(|p| unsafe { *p = value });

        while self.committed.load(Ordering::Acquire) != seq {
            thread::yield_now();
        }
        self.committed.store(seq + 1, Ordering::Release);
        true
    }

    /// Claims the consumer cursor from `start` to `end`, spinning while an
    /// observer holds it. `None` if nothing is committed.
    fn claim(&self, whole_range: bool) -> Option<(u64, u64)> {
        loop {
            let consumed = self.consumed.load(Ordering::Acquire);
            if consumed & OBSERVING != 0 {
                thread::yield_now();
                continue;
            }
            let committed = self.committed.load(Ordering::Acquire);
            if consumed >= committed {
                return None;
            }
            let end = if whole_range { committed } else { consumed + 1 };
            if self
                .consumed
                .compare_exchange(consumed, end, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some((consumed, end));
            }
        }
    }

    fn release(&self, start: u64, end: u64) {
        while self.released.load(Ordering::Acquire) != start {
            thread::yield_now();
        }
        self.released.store(end, Ordering::Release);
    }

    fn poll(&self) -> Option<u64> {
        let (seq, end) = self.claim(false)?;
        let value = self.slot(seq).with(|p| unsafe { *p });
        self.release(seq, end);
        Some(value)
    }

    fn clear(&self) -> usize {
        let Some((start, end)) = self.claim(true) else {
            return 0;
        };
        for seq in start..end {
            self.slot(seq).with(|p| unsafe { *p });
        }
        self.release(start, end);
        (end - start) as usize
    }

    fn peek(&self) -> Option<u64> {
        loop {
            let consumed = self.consumed.load(Ordering::Acquire);
            if consumed & OBSERVING != 0 {
                thread::yield_now();
                continue;
            }
            let committed = self.committed.load(Ordering::Acquire);
            if consumed >= committed {
                return None;
            }
            if self
                .consumed
                .compare_exchange(
                    consumed,
                    consumed | OBSERVING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                let value = self.slot(consumed).with(|p| unsafe { *p });
                self.consumed.store(consumed, Ordering::Release);
                return Some(value);
            }
        }
    }
}

/// Two producers race for the reservation cursor; nothing is lost or duplicated.
#[test]
fn loom_two_producers_one_consumer() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new(2));

        let producers: Vec<_> = [1u64, 2]
            .into_iter()
            .map(|value| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || assert!(queue.offer(value)))
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        let mut received = vec![queue.poll().unwrap(), queue.poll().unwrap()];
        received.sort_unstable();
        assert_eq!(received, vec![1, 2]);
        assert_eq!(queue.poll(), None);
    });
}

/// Two consumers race for the same committed elements.
#[test]
fn loom_two_consumers_split_elements() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new(2));
        assert!(queue.offer(10));
        assert!(queue.offer(20));

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.poll())
            })
            .collect();

        let mut received: Vec<u64> = consumers
            .into_iter()
            .filter_map(|c| c.join().unwrap())
            .collect();
        received.sort_unstable();
        assert_eq!(received, vec![10, 20]);
    });
}

/// A producer wrapping onto a slot never races the consumer still reading it.
#[test]
fn loom_slot_reuse_waits_for_release() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new(2));
        assert!(queue.offer(1));
        assert!(queue.offer(2));
        assert!(!queue.offer(3));

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.poll())
        };

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.offer(3))
        };

        assert_eq!(consumer.join().unwrap(), Some(1));
        let wrapped = producer.join().unwrap();

        assert_eq!(queue.poll(), Some(2));
        if wrapped {
            assert_eq!(queue.poll(), Some(3));
        }
        assert_eq!(queue.poll(), None);
    });
}

/// Capacity gate holds under a concurrent producer and consumer.
#[test]
fn loom_bounded_backlog() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new(1));

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let first = queue.offer(1);
                let second = queue.offer(2);
                usize::from(first) + usize::from(second)
            })
        };

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.poll().is_some())
        };

        let sent = producer.join().unwrap();
        let got = usize::from(consumer.join().unwrap());

        assert!(got <= sent);
        let reserved = queue.reserved.load(Ordering::Acquire);
        let released = queue.released.load(Ordering::Acquire);
        assert!(reserved - released <= 1);
    });
}

/// A peek overlapping a poll and a wrapping producer never reads a slot that
/// is being moved out or overwritten.
#[test]
fn loom_peek_races_poll_and_wrapping_producer() {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        let queue = Arc::new(LoomQueue::new(2));
        assert!(queue.offer(1));
        assert!(queue.offer(2));

        let peeker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.peek())
        };
        let poller = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.poll())
        };
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.offer(3))
        };

        let seen = peeker.join().unwrap();
        assert_eq!(poller.join().unwrap(), Some(1));
        let wrapped = producer.join().unwrap();

        assert!(matches!(seen, Some(1 | 2)));
        assert_eq!(queue.consumed.load(Ordering::Acquire) & OBSERVING, 0);
        assert_eq!(queue.poll(), Some(2));
        if wrapped {
            assert_eq!(queue.poll(), Some(3));
        }
        assert_eq!(queue.poll(), None);
    });
}

/// `clear` and `poll` split the committed elements; none is taken twice.
#[test]
fn loom_clear_races_poll() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new(2));
        assert!(queue.offer(1));
        assert!(queue.offer(2));

        let clearer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.clear())
        };
        let poller = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.poll())
        };

        let cleared = clearer.join().unwrap();
        let polled = poller.join().unwrap();

        match polled {
            Some(1) => assert_eq!(cleared, 1),
            None => assert_eq!(cleared, 2),
            other => panic!("poll took {other:?} out of order"),
        }
        assert_eq!(queue.poll(), None);
        assert_eq!(
            queue.released.load(Ordering::Acquire),
            queue.reserved.load(Ordering::Acquire)
        );
        assert!(queue.offer(4));
        assert!(queue.offer(5));
    });
}
