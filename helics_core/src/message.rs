//! The message data model: the single payload type that flows through endpoints, filters,
//! and the timer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::Time;

/// Process-local monotonic message identifier. Zero is never assigned, so it is safe to
/// use as an "unset" sentinel when matching filter returns (§4.9).
pub type MessageId = i64;

bitflags::bitflags! {
    /// Bit flags carried on a [`Message`].
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MessageFlags: u16 {
        /// The message must be delivered; a core that cannot route it is an error rather
        /// than a silent drop.
        const REQUIRED = 0b0000_0001;
        const EXTRA1 = 0b0000_0010;
        const EXTRA2 = 0b0000_0100;
        const EXTRA3 = 0b0000_1000;
        const EXTRA4 = 0b0001_0000;
        /// Set by the firewall operator's `set_flag_N` outcomes, or when the owning
        /// endpoint has disconnected.
        const DISCONNECTED = 0b0010_0000;
    }
}

/// A discrete message in flight between two endpoints.
///
/// `original_source`/`original_destination` are set the first time the message
/// traverses a filter and are never overwritten afterwards, even if subsequent filters
/// rewrite `destination` again; they record the endpoints the producer and (first
/// resolved) consumer actually used.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub source: String,
    pub original_source: String,
    pub destination: String,
    pub original_destination: String,
    pub payload: Vec<u8>,
    pub time: Time,
    pub message_id: MessageId,
    pub flags: MessageFlags,
}

impl Message {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, payload: Vec<u8>, time: Time) -> Self {
        let source = source.into();
        let destination = destination.into();
        Self {
            original_source: source.clone(),
            original_destination: destination.clone(),
            source,
            destination,
            payload,
            time,
            message_id: 0,
            flags: MessageFlags::default(),
        }
    }

    /// Rewrite the destination, capturing `original_destination` on the first call only.
    pub fn rewrite_destination(&mut self, new_destination: impl Into<String>) {
        self.destination = new_destination.into();
    }

    /// Advance `time`, clamping (and signalling via the bool) any attempt to move it
    /// backwards — per §4.9.4, a lower time must be clamped and logged by the caller.
    pub fn set_time_monotone(&mut self, new_time: Time) -> bool {
        if new_time < self.time {
            false
        } else {
            self.time = new_time;
            true
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.flags.contains(MessageFlags::DISCONNECTED)
    }

    /// Produce a clone of this message addressed to a different delivery endpoint, as
    /// performed by a cloning filter (§4.4). The clone's `original_destination` is fixed
    /// to the input's *current* destination, not its original one.
    pub fn clone_to(&self, delivery_endpoint: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.original_destination = self.destination.clone();
        copy.destination = delivery_endpoint.into();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_captures_original_endpoints() {
        let msg = Message::new("port1", "port2", vec![1, 2, 3], Time::ZERO);
        assert_eq!(msg.original_source, "port1");
        assert_eq!(msg.original_destination, "port2");
    }

    #[test]
    fn rewrite_destination_does_not_touch_original() {
        let mut msg = Message::new("port1", "port2", vec![], Time::ZERO);
        msg.rewrite_destination("port3");
        assert_eq!(msg.destination, "port3");
        assert_eq!(msg.original_destination, "port2");
    }

    #[test]
    fn time_cannot_move_backwards() {
        let mut msg = Message::new("a", "b", vec![], Time::new(5.0));
        assert!(!msg.set_time_monotone(Time::new(1.0)));
        assert_eq!(msg.time, Time::new(5.0));
        assert!(msg.set_time_monotone(Time::new(7.0)));
        assert_eq!(msg.time, Time::new(7.0));
    }

    #[test]
    fn clone_to_records_current_destination_as_original() {
        let mut msg = Message::new("src", "dest", b"hi".to_vec(), Time::ZERO);
        msg.rewrite_destination("dest2");
        let clone = msg.clone_to("cm");
        assert_eq!(clone.destination, "cm");
        assert_eq!(clone.original_destination, "dest2");
        assert_eq!(clone.payload, msg.payload);
    }
}
