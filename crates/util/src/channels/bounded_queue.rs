//! This module defines [BoundedQueue], a fixed-capacity FIFO queue meant to
//! sit between a single producing thread and a single consuming thread.
//!
//! - The producer [pushes](BoundedQueue::push) and is put to sleep while the
//!   queue is full (backpressure). Values are never dropped or overwritten to
//!   make room.
//! - The consumer [pops](BoundedQueue::try_pop) without ever blocking, so a
//!   slow producer can't stall it.
//! - Any thread may [close](BoundedQueue::close) the queue. Closing wakes a
//!   sleeping producer, rejects every future push, and leaves whatever is
//!   already queued in place so it can still be drained.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{PushError, THREAD_PANIC_MSG};

/// A fixed-capacity, closable FIFO queue. See the [module](self) docs.
///
/// The queue is usually shared through an [Arc](std::sync::Arc). The producer
/// can hold a [Weak](std::sync::Weak) reference instead so that it notices
/// when the owner of the queue is gone.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,

    /// Notified whenever space opens up (a pop) or the queue is closed. Only
    /// pushers ever wait on this.
    space_or_closed: Condvar,

    capacity: usize,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> BoundedQueue<T> {
    /// Create an open, empty queue that can hold up to `capacity` items.
    ///
    /// Panics if `capacity` is `0` (nothing could ever be pushed).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "A bounded queue needs a non-zero capacity.");

        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            space_or_closed: Condvar::new(),
            capacity,
        }
    }

    /// Push `item` onto the back of the queue, sleeping while the queue is
    /// full.
    ///
    /// If the queue is closed (or gets closed while waiting for space),
    /// nothing is pushed and `item` is handed back in
    /// [PushError::Closed].
    ///
    /// Also see [Self::try_push] and [Self::push_timeout].
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut state = self.lock();

        while !state.closed && state.items.len() >= self.capacity {
            state = self.space_or_closed.wait(state).expect(THREAD_PANIC_MSG);
        }

        self.push_locked(state, item)
    }

    /// Push `item` onto the back of the queue, sleeping for up to `timeout`
    /// while the queue is full.
    ///
    /// [PushError::Timeout] is returned if no space opened up in time and
    /// [PushError::Closed] is returned if the queue is (or gets) closed. Note
    /// that this function's execution may take slightly longer than `timeout`.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), PushError<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        while !state.closed && state.items.len() >= self.capacity {
            let time_until_deadline = deadline.saturating_duration_since(Instant::now());
            if time_until_deadline.is_zero() {
                return Err(PushError::Timeout { item, timeout });
            }

            state = self
                .space_or_closed
                .wait_timeout(state, time_until_deadline)
                .expect(THREAD_PANIC_MSG)
                .0;
        }

        self.push_locked(state, item)
    }

    /// Push `item` onto the back of the queue without waiting.
    ///
    /// [PushError::Full] is returned if there's no space right now and
    /// [PushError::Closed] is returned if the queue is closed.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let state = self.lock();

        if !state.closed && state.items.len() >= self.capacity {
            return Err(PushError::Full(item));
        }

        self.push_locked(state, item)
    }

    /// Pop the item at the front of the queue, or return [None] if the queue
    /// is empty. This never waits for an item, whether the queue is open or
    /// closed.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.lock().items.pop_front()?;

        // A producer may be waiting for exactly this slot.
        self.space_or_closed.notify_one();

        Some(item)
    }

    /// Close the queue. Every waiting [Self::push] wakes up and fails, and
    /// every future push fails. Items already in the queue stay there and can
    /// still be popped.
    ///
    /// Closing an already closed queue does nothing, so this is safe to call
    /// from any thread, any number of times.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);

        self.space_or_closed.notify_all();
    }

    /// Whether [Self::close] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Whether the queue is closed *and* has nothing left to pop. Once this is
    /// true it stays true.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.closed && state.items.is_empty()
    }

    /// The number of items currently waiting to be popped.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether there are no items waiting to be popped.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// The maximum number of items the queue holds at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().expect(THREAD_PANIC_MSG)
    }

    /// Finish a push once the caller has made sure the queue is either closed
    /// or has room.
    fn push_locked(
        &self,
        mut state: MutexGuard<'_, QueueState<T>>,
        item: T,
    ) -> Result<(), PushError<T>> {
        if state.closed {
            return Err(PushError::Closed(item));
        }

        debug_assert!(state.items.len() < self.capacity);
        state.items.push_back(item);

        Ok(())
    }
}
