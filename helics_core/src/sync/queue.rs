//! Blocking MPMC queue and single-slot air-lock handoff (§4.2).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// The two bands a queued item can land in. Anything pushed into the priority band is
/// popped ahead of everything already waiting in the normal band.
struct Bands<T> {
    priority: VecDeque<T>,
    normal: VecDeque<T>,
}

impl<T> Bands<T> {
    fn new() -> Self {
        Self { priority: VecDeque::new(), normal: VecDeque::new() }
    }

    fn pop_front(&mut self) -> Option<T> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }

    fn len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }
}

/// An MPMC queue where `push`/`push_priority` never block and `pop` blocks until an item
/// (or shutdown) is available.
///
/// Unlike the two-vector swap design it is grounded on, this implementation uses two
/// `VecDeque`s (one per priority band) behind one mutex rather than the
/// producer/consumer lock-splitting that design exists for: the core's usage pattern
/// (low-hundreds of messages in flight) does not need a second lock, but it does need
/// the priority band itself, since a command enqueued there must overtake anything
/// already waiting in the normal band.
pub struct BlockingQueue<T> {
    state: Mutex<Bands<T>>,
    condition: Condvar,
    closed: AtomicBool,
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Bands::new()),
            condition: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue into the normal band.
    pub fn push(&self, value: T) {
        let mut queue = self.state.lock().expect("queue poisoned");
        queue.normal.push_back(value);
        self.condition.notify_one();
    }

    /// Enqueue into the priority band, so this item is popped ahead of anything already
    /// waiting in the normal band.
    pub fn push_priority(&self, value: T) {
        let mut queue = self.state.lock().expect("queue poisoned");
        queue.priority.push_back(value);
        self.condition.notify_one();
    }

    /// Non-blocking pop; returns `None` if currently empty. Drains the priority band
    /// first.
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().expect("queue poisoned").pop_front()
    }

    /// Blocks until an item is available or the queue is shut down (in which case
    /// `None` is returned). Drains the priority band first.
    pub fn pop(&self) -> Option<T> {
        let mut queue = self.state.lock().expect("queue poisoned");
        loop {
            if let Some(value) = queue.pop_front() {
                return Some(value);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            queue = self.condition.wait(queue).expect("queue poisoned");
        }
    }

    /// Blocks until an item is available, the queue is shut down, or `timeout` elapses.
    /// Drains the priority band first.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut queue = self.state.lock().expect("queue poisoned");
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(value) = queue.pop_front() {
                return Some(value);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, result) = self.condition.wait_timeout(queue, remaining).expect("queue poisoned");
            queue = guard;
            if result.timed_out() && queue.len() == 0 {
                return None;
            }
        }
    }

    /// Wakes every blocked consumer; subsequent `pop` calls return `None` once drained.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.condition.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single-slot handoff used to move an object from a concurrent producer context into a
/// single-thread consumer, without the producer blocking on a full queue capacity of one.
///
/// `try_load` publishes with release ordering and succeeds iff the slot was empty;
/// `try_unload` acquires and succeeds iff the slot was full; `load` blocks until the slot
/// is full. Spurious wakes are tolerated by re-checking the flag under the mutex after
/// each wait.
pub struct AirLock<T> {
    loaded: AtomicBool,
    door: Mutex<Option<T>>,
    condition: Condvar,
}

impl<T> Default for AirLock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AirLock<T> {
    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            door: Mutex::new(None),
            condition: Condvar::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Attempts to place `value` into the slot. Fails (returning `value` back) if the
    /// slot is already full.
    pub fn try_load(&self, value: T) -> Result<(), T> {
        if self.loaded.load(Ordering::Acquire) {
            return Err(value);
        }
        let mut slot = self.door.lock().expect("air-lock poisoned");
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        self.loaded.store(true, Ordering::Release);
        self.condition.notify_one();
        Ok(())
    }

    /// Attempts to take the value out of the slot. Returns `None` if the slot is empty.
    pub fn try_unload(&self) -> Option<T> {
        if !self.loaded.load(Ordering::Acquire) {
            return None;
        }
        let mut slot = self.door.lock().expect("air-lock poisoned");
        let value = slot.take();
        if value.is_some() {
            self.loaded.store(false, Ordering::Release);
        }
        value
    }

    /// Blocks until the slot is full, then takes the value.
    pub fn load(&self) -> T {
        let mut slot = self.door.lock().expect("air-lock poisoned");
        loop {
            if let Some(value) = slot.take() {
                self.loaded.store(false, Ordering::Release);
                return value;
            }
            slot = self.condition.wait(slot).expect("air-lock poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_then_pop_returns_in_fifo_order() {
        let queue = BlockingQueue::new();
        queue.push(1);
        queue.push(2);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn shutdown_unblocks_a_waiting_pop() {
        let queue = Arc::new(BlockingQueue::<i32>::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.shutdown();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn pop_timeout_returns_none_on_expiry() {
        let queue = BlockingQueue::<i32>::new();
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn priority_band_overtakes_items_already_queued_normally() {
        let queue = BlockingQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push_priority(99);
        assert_eq!(queue.pop(), Some(99));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn air_lock_try_load_fails_while_full() {
        let lock = AirLock::new();
        assert!(lock.try_load(1).is_ok());
        assert_eq!(lock.try_load(2), Err(2));
        assert_eq!(lock.try_unload(), Some(1));
        assert_eq!(lock.try_unload(), None);
    }

    #[test]
    fn air_lock_blocking_load_waits_for_producer() {
        let lock = Arc::new(AirLock::<i32>::new());
        let consumer = {
            let lock = lock.clone();
            thread::spawn(move || lock.load())
        };
        thread::sleep(Duration::from_millis(20));
        lock.try_load(42).unwrap();
        assert_eq!(consumer.join().unwrap(), 42);
    }
}
