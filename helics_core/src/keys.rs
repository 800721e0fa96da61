//! Vector-backed slot keys for the core's internal registries.
//!
//! These are distinct from the public, wire-visible identifiers in [`crate::ids`]: a
//! `FilterKey` or `EndpointKey` only ever indexes this process's own `TinyMap`s and is
//! never sent across the network or exposed through the public API.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

tinymap::key_type! {
    /// Slot key for a registered endpoint.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub EndpointKey
}

tinymap::key_type! {
    /// Slot key for a registered filter.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub FilterKey
}

tinymap::key_type! {
    /// Slot key for an entry in the message timer's heap.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub TimerKey
}
