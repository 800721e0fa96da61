//! Message timer (§4.6): schedules a message for delivery at a future simulated-time
//! instant, tracked against wall-clock via `tokio::time`, so a filter with a real-time
//! delay actually fires after the wall-clock duration elapses rather than only when the
//! time coordinator advances.
//!
//! Grounded on `MessageTimer.hpp`: a vector of expiration times and buffered messages
//! protected by one lock, with the send callback invoked on expiration. The original
//! drives `boost::asio::steady_timer`s off a shared io_service; this port drives
//! `tokio::time::sleep` tasks off the ambient runtime instead, cancelled through
//! `JoinHandle::abort` rather than asio's `cancel()`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use helics_core::message::Message;

/// Index returned by [`MessageTimer::add_timer`], used to cancel or update a pending
/// send.
pub type TimerIndex = usize;

struct Slot {
    handle: JoinHandle<()>,
    expiration: Instant,
    message: Option<Message>,
}

/// Schedules messages for delivery at a future wall-clock instant. The callback given to
/// [`MessageTimer::new`] is invoked, off the calling thread, once per expired timer.
pub struct MessageTimer {
    slots: Arc<Mutex<Vec<Option<Slot>>>>,
    send: Arc<dyn Fn(Message) + Send + Sync>,
}

impl MessageTimer {
    pub fn new(send: impl Fn(Message) + Send + Sync + 'static) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Vec::new())),
            send: Arc::new(send),
        }
    }

    /// Schedule `message` to fire `delay` from now. Returns the index used to cancel or
    /// update this timer.
    pub fn add_timer_from_now(&self, delay: Duration, message: Message) -> TimerIndex {
        self.add_timer(Instant::now() + delay, message)
    }

    /// Schedule `message` to fire at `expiration`.
    pub fn add_timer(&self, expiration: Instant, message: Message) -> TimerIndex {
        let mut slots = self.slots.lock().unwrap();
        let index = slots.len();
        let handle = self.spawn_fire(index, expiration);
        slots.push(Some(Slot {
            handle,
            expiration,
            message: Some(message),
        }));
        index
    }

    fn spawn_fire(&self, index: TimerIndex, expiration: Instant) -> JoinHandle<()> {
        let slots = Arc::clone(&self.slots);
        let send = Arc::clone(&self.send);
        tokio::spawn(async move {
            tokio::time::sleep_until(expiration).await;
            Self::fire(&slots, &*send, index);
        })
    }

    fn fire(slots: &Mutex<Vec<Option<Slot>>>, send: &dyn Fn(Message), index: TimerIndex) {
        let message = {
            let mut guard = slots.lock().unwrap();
            guard.get_mut(index).and_then(|slot| slot.take()).and_then(|slot| slot.message)
        };
        if let Some(message) = message {
            send(message);
        }
    }

    /// Cancel a pending timer. A no-op if it already fired or was already cancelled.
    pub fn cancel(&self, index: TimerIndex) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(index).and_then(|s| s.take()) {
            slot.handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        let mut slots = self.slots.lock().unwrap();
        for slot in slots.iter_mut().filter_map(|s| s.take()) {
            slot.handle.abort();
        }
    }

    /// Re-point a timer at a new expiration, replacing its message.
    pub fn update_timer(&self, index: TimerIndex, expiration: Instant, message: Message) {
        self.cancel(index);
        let handle = self.spawn_fire(index, expiration);
        let mut slots = self.slots.lock().unwrap();
        if index >= slots.len() {
            slots.resize_with(index + 1, || None);
        }
        slots[index] = Some(Slot {
            handle,
            expiration,
            message: Some(message),
        });
    }

    /// Push a timer's expiration back by `extra`, keeping its message. Returns false if
    /// the timer has already fired or was cancelled.
    pub fn add_time_to_timer(&self, index: TimerIndex, extra: Duration) -> bool {
        let (expiration, message) = {
            let mut slots = self.slots.lock().unwrap();
            match slots.get_mut(index).and_then(|s| s.take()) {
                Some(slot) => {
                    slot.handle.abort();
                    (slot.expiration + extra, slot.message)
                }
                None => return false,
            }
        };
        let Some(message) = message else { return false };
        self.update_timer(index, expiration, message);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::time::Time;
    use std::sync::mpsc;

    fn msg() -> Message {
        Message::new("a", "b", vec![], Time::ZERO)
    }

    #[tokio::test]
    async fn fires_after_delay() {
        let (tx, rx) = mpsc::channel();
        let timer = MessageTimer::new(move |m| tx.send(m).unwrap());
        timer.add_timer_from_now(Duration::from_millis(10), msg());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn cancel_prevents_delivery() {
        let (tx, rx) = mpsc::channel::<Message>();
        let timer = MessageTimer::new(move |m| tx.send(m).unwrap());
        let idx = timer.add_timer_from_now(Duration::from_millis(10), msg());
        timer.cancel(idx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn add_time_to_timer_delays_delivery() {
        let (tx, rx) = mpsc::channel();
        let timer = MessageTimer::new(move |m| tx.send(m).unwrap());
        let idx = timer.add_timer_from_now(Duration::from_millis(10), msg());
        assert!(timer.add_time_to_timer(idx, Duration::from_millis(40)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_ok());
    }
}
