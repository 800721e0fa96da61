//! Broker-base event loop (§4.10): the single-threaded command dispatcher every broker
//! and core in this subsystem runs, hosting a filter federate's state machine on top of
//! it.
//!
//! Grounded on `BrokerBase.cpp`'s `queueProcessingLoop`: one action queue, a periodic
//! tick (used to detect a broker that's gone quiet) that only actually fires if nothing
//! else arrived since the last one, and four always-handled command codes
//! (`CMD_TICK`/`CMD_IGNORE`/`CMD_TERMINATE_IMMEDIATELY`/`CMD_STOP`) ahead of whatever the
//! caller wants to do with everything else. The source drives its tick off a
//! `boost::asio::steady_timer` on a dedicated thread; this port uses the blocking
//! `BlockingQueue::pop_timeout` already in `helics_core::sync::queue` to the same effect
//! without pulling in a separate reactor.

pub mod cli;
pub mod network;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use helics_core::ids::BrokerId;
use helics_core::sync::queue::BlockingQueue;

use crate::protocol::{ActionKind, ActionMessage};

const ID_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Generate a broker/core identifier unique enough to disambiguate log lines across a
/// federation: `<pid>-<21 random characters with a literal '-' at position 10>`.
pub fn generate_identifier() -> String {
    let mut rng = rand::thread_rng();
    let mut name = vec![0u8; 21];
    for (i, slot) in name.iter_mut().enumerate() {
        *slot = if i == 10 { b'-' } else { ID_CHARS[rng.gen_range(0..ID_CHARS.len())] };
    }
    format!("{}-{}", std::process::id(), String::from_utf8(name).unwrap())
}

/// Shared state and action queue for a broker-base event loop. Does not own a thread;
/// `run` blocks the calling thread, matching the dedicated `_queue_processing_thread` in
/// the source.
pub struct BrokerBase {
    pub identifier: String,
    pub broker_id: BrokerId,
    tick_interval: Duration,
    pub dumplog: bool,
    halt_operations: AtomicBool,
    main_loop_running: AtomicBool,
    queue: Arc<BlockingQueue<ActionMessage>>,
}

impl BrokerBase {
    pub fn new(identifier: impl Into<String>, broker_id: BrokerId, tick_interval: Duration) -> Self {
        Self {
            identifier: identifier.into(),
            broker_id,
            tick_interval,
            dumplog: false,
            halt_operations: AtomicBool::new(false),
            main_loop_running: AtomicBool::new(false),
            queue: Arc::new(BlockingQueue::new()),
        }
    }

    pub fn queue_handle(&self) -> Arc<BlockingQueue<ActionMessage>> {
        Arc::clone(&self.queue)
    }

    /// Enqueue a command, routing it into the priority band ahead of ordinary traffic
    /// when `message.is_priority()` says it belongs there.
    pub fn add_action_message(&self, message: ActionMessage) {
        if message.is_priority() {
            self.queue.push_priority(message);
        } else {
            self.queue.push(message);
        }
    }

    pub fn is_running(&self) -> bool {
        self.main_loop_running.load(Ordering::Acquire)
    }

    pub fn halt_operations(&self) -> bool {
        self.halt_operations.load(Ordering::Acquire)
    }

    /// Run the dispatch loop until a `Stop` or `TerminateImmediately` command arrives.
    /// `process_command`/`process_priority_command` handle everything else;
    /// `process_disconnect` runs once, only on a graceful `Stop`.
    pub fn run(
        &self,
        mut process_command: impl FnMut(ActionMessage),
        mut process_priority_command: impl FnMut(ActionMessage),
        mut process_disconnect: impl FnMut(),
    ) {
        self.main_loop_running.store(true, Ordering::Release);
        let mut messages_since_last_tick: u32 = 0;
        let mut dumped = Vec::new();

        loop {
            let command = match self.queue.pop_timeout(self.tick_interval) {
                Some(cmd) => cmd,
                None => ActionMessage::tick(),
            };
            if self.dumplog {
                dumped.push(command.clone());
            }
            match command.action {
                ActionKind::Tick => {
                    if messages_since_last_tick == 0 {
                        process_command(command);
                    }
                    messages_since_last_tick = 0;
                }
                ActionKind::Ignore => {}
                ActionKind::TerminateImmediately => {
                    self.main_loop_running.store(false, Ordering::Release);
                    return;
                }
                ActionKind::Stop => {
                    if !self.halt_operations() {
                        process_command(command);
                        self.main_loop_running.store(false, Ordering::Release);
                        process_disconnect();
                    }
                    return;
                }
                _ => {
                    if !self.halt_operations() {
                        messages_since_last_tick += 1;
                        if command.is_priority() {
                            process_priority_command(command);
                        } else {
                            process_command(command);
                        }
                    }
                }
            }
        }
    }

    pub fn request_stop(&self) {
        self.add_action_message(ActionMessage::new(
            helics_core::ids::FederateId::invalid(),
            helics_core::ids::FederateId::invalid(),
            ActionKind::Stop,
        ));
    }

    pub fn request_terminate_immediately(&self) {
        self.add_action_message(ActionMessage::new(
            helics_core::ids::FederateId::invalid(),
            helics_core::ids::FederateId::invalid(),
            ActionKind::TerminateImmediately,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::ids::FederateId;
    use std::sync::Mutex;

    #[test]
    fn generated_identifier_has_expected_shape() {
        let id = generate_identifier();
        let parts: Vec<&str> = id.splitn(2, '-').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].len(), 21);
        assert_eq!(parts[1].as_bytes()[10], b'-');
    }

    #[test]
    fn run_exits_immediately_on_terminate() {
        let base = BrokerBase::new("b1", BrokerId::new(1), Duration::from_secs(60));
        base.request_terminate_immediately();
        let seen = Mutex::new(0);
        base.run(|_| *seen.lock().unwrap() += 1, |_| {}, || {});
        assert_eq!(*seen.lock().unwrap(), 0);
        assert!(!base.is_running());
    }

    #[test]
    fn run_dispatches_regular_commands_before_stopping() {
        let base = BrokerBase::new("b1", BrokerId::new(1), Duration::from_secs(60));
        base.add_action_message(ActionMessage::new(FederateId::new(1), FederateId::new(2), ActionKind::Ignore));
        base.request_stop();
        let disconnected = Mutex::new(false);
        base.run(|_| {}, |_| {}, || *disconnected.lock().unwrap() = true);
        assert!(*disconnected.lock().unwrap());
    }

    #[test]
    fn a_priority_command_overtakes_data_plane_traffic_queued_ahead_of_it() {
        let base = BrokerBase::new("b1", BrokerId::new(1), Duration::from_secs(60));
        let msg = helics_core::message::Message::new("a", "b", vec![], helics_core::time::Time::ZERO);
        base.add_action_message(ActionMessage::new(FederateId::new(1), FederateId::new(2), ActionKind::SendMessage(msg)));
        base.request_terminate_immediately();
        let seen = Mutex::new(0);
        base.run(|_| *seen.lock().unwrap() += 1, |_| {}, || {});
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}
