//! Wire protocol: the action-message envelope exchanged between a filter federate, the
//! broker-base loop that hosts it, and the cores/brokers it talks to (§6).
//!
//! The action-code enum is not lifted from any single original file (HELICS's own
//! `ActionMessage`/`core-data.hpp` carries dozens of action codes spanning the whole
//! core, most of which are out of scope here); it is sized down to the commands the
//! broker-base loop in `BrokerBase.cpp` and the filter federate in `FilterFederate.hpp`
//! actually dispatch on.

use helics_core::ids::{BrokerId, FederateId, GlobalHandle};
use helics_core::message::Message;
use helics_core::time::Time;
use serde::{Deserialize, Serialize};

use crate::filters::FilterOperationKind;

/// One unit of work passed through a broker's action queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMessage {
    pub source_id: FederateId,
    pub dest_id: FederateId,
    pub action: ActionKind,
}

impl ActionMessage {
    pub fn new(source_id: FederateId, dest_id: FederateId, action: ActionKind) -> Self {
        Self { source_id, dest_id, action }
    }

    pub fn tick() -> Self {
        Self::new(FederateId::invalid(), FederateId::invalid(), ActionKind::Tick)
    }

    pub fn is_priority(&self) -> bool {
        matches!(self.action, ActionKind::TerminateImmediately | ActionKind::Stop | ActionKind::Tick)
    }
}

/// Command codes dispatched by the broker-base event loop (§4.10) and, where a message
/// is carried, by the filter federate (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionKind {
    /// Periodic heartbeat; triggers a tick only if no other traffic arrived since the
    /// last one.
    Tick,
    /// Dispatched but otherwise dropped.
    Ignore,
    /// Halt the processing loop without running shutdown bookkeeping.
    TerminateImmediately,
    /// Halt the processing loop after running `process_disconnect`.
    Stop,
    /// A message in flight, headed for (or already through) an endpoint's filter chain.
    SendMessage(Message),
    /// The result of an asynchronous source filter operation finishing.
    FilterReturn { process_id: i64, result: Option<Message> },
    /// The result of an asynchronous destination filter operation finishing.
    DestFilterReturn { process_id: i64, result: Option<Message> },
    /// Register a new endpoint on the filter federate identified by `dest_id`.
    RegisterEndpoint { name: String },
    /// Register a new filter on the filter federate identified by `dest_id`.
    RegisterFilter {
        name: String,
        kind: FilterOperationKind,
        target: String,
        cloning: bool,
        source_side: bool,
    },
    /// A filter handle has closed (§4.8): `handle` names the closed filter, flagged
    /// disconnected so it is traversed as identity from then on.
    Disconnect { handle: GlobalHandle },
    /// A federate/broker has granted time up to `grant_time` (consumed, not produced,
    /// by the time coordinator external collaborator; carried here only as a command).
    TimeGrant { grant_time: Time },
}

/// Identifies the sending/receiving broker in the transport layer below the action
/// queue, kept distinct from `FederateId` because a broker and a federate id share one
/// numeric space (§3).
pub type BrokerEndpoint = BrokerId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_and_stop_are_priority_commands() {
        let tick = ActionMessage::tick();
        assert!(tick.is_priority());
        let stop = ActionMessage::new(FederateId::invalid(), FederateId::invalid(), ActionKind::Stop);
        assert!(stop.is_priority());
    }

    #[test]
    fn send_message_is_not_priority() {
        let msg = Message::new("a", "b", vec![], Time::ZERO);
        let cmd = ActionMessage::new(FederateId::new(1), FederateId::new(2), ActionKind::SendMessage(msg));
        assert!(!cmd.is_priority());
    }
}
