//! Strongly typed identifiers for federates, brokers, interfaces, and routes.
//!
//! Mirrors the reserved-range scheme used throughout the core: federate and broker numbers
//! share one signed integer space, partitioned by a pair of shift constants so that the
//! range an id falls in is recoverable without any side table.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Base integer type backing every identifier in this module.
pub type IdBase = i64;

/// Shift separating local federate indices from the global federate id space.
///
/// An id below this shift (and above the broker shift) is a bare local index; at or above
/// it, the low bits are the local index and the id is globally assigned.
pub const GLOBAL_FEDERATE_ID_SHIFT: IdBase = 0x0002_0000;
/// Shift marking the start of the broker id space. Ids at or above this (other than the
/// reserved root broker id `1`) are brokers rather than federates.
pub const GLOBAL_BROKER_ID_SHIFT: IdBase = 0x7000_0000;
/// Block size used to separate global priority levels when generating special federate ids.
pub const GLOBAL_PRIORITY_BLOCK_SIZE: IdBase = 100_000_000;

const INVALID_ID: IdBase = -2_010_000_000;

/// Globally unique identifier for a broker (or core, which is a leaf broker).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrokerId(IdBase);

/// Globally unique identifier for a federate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FederateId(IdBase);

/// Identifier for a route in the transport layer's forwarding table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId(IdBase);

/// Process-local handle for an interface (endpoint or filter) owned by a federate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceHandle(IdBase);

/// Identifier used to indicate a command is addressed to the parent object.
pub const PARENT_BROKER_ID: BrokerId = BrokerId(0);
/// The id of the root broker at the top of the tree.
pub const ROOT_BROKER_ID: BrokerId = BrokerId(1);
/// Target the local core directly, bypassing global id assignment.
pub const DIRECT_CORE_ID: FederateId = FederateId(-235262);

impl BrokerId {
    pub const fn new(value: IdBase) -> Self {
        Self(value)
    }

    pub const fn invalid() -> Self {
        Self(INVALID_ID)
    }

    pub const fn value(&self) -> IdBase {
        self.0
    }

    pub const fn is_federate(&self) -> bool {
        self.0 >= GLOBAL_FEDERATE_ID_SHIFT && self.0 < GLOBAL_BROKER_ID_SHIFT
    }

    pub const fn is_broker(&self) -> bool {
        self.0 >= GLOBAL_BROKER_ID_SHIFT || self.0 == 1
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != INVALID_ID
    }

    /// The index of this broker relative to the start of the broker range.
    pub const fn local_index(&self) -> IdBase {
        if self.0 >= GLOBAL_BROKER_ID_SHIFT {
            self.0 - GLOBAL_BROKER_ID_SHIFT
        } else {
            self.0
        }
    }
}

impl Default for BrokerId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Debug for BrokerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BrokerId({})", self.0)
    }
}

impl FederateId {
    pub const fn new(value: IdBase) -> Self {
        Self(value)
    }

    pub const fn invalid() -> Self {
        Self(INVALID_ID)
    }

    pub const fn value(&self) -> IdBase {
        self.0
    }

    pub const fn is_federate(&self) -> bool {
        self.0 >= GLOBAL_FEDERATE_ID_SHIFT && self.0 < GLOBAL_BROKER_ID_SHIFT
    }

    pub const fn is_broker(&self) -> bool {
        self.0 >= GLOBAL_BROKER_ID_SHIFT || self.0 == 1
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != INVALID_ID
    }

    pub const fn local_index(&self) -> IdBase {
        if self.0 >= GLOBAL_FEDERATE_ID_SHIFT {
            self.0 - GLOBAL_FEDERATE_ID_SHIFT
        } else {
            self.0
        }
    }

    pub const fn as_broker_id(&self) -> BrokerId {
        BrokerId(self.0)
    }
}

impl Default for FederateId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Debug for FederateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FederateId({})", self.0)
    }
}

impl From<BrokerId> for FederateId {
    fn from(id: BrokerId) -> Self {
        Self(id.0)
    }
}

impl From<FederateId> for BrokerId {
    fn from(id: FederateId) -> Self {
        Self(id.0)
    }
}

/// Generate a special federate id for the Nth reserved slot (e.g. the filter federate)
/// of the core/broker identified by `broker`.
///
/// Three special federate ids are reserved per subbroker/core, carved out of the broker's
/// own id space just below its assigned broker id (or, for the root broker, below the
/// priority block).
pub const fn special_federate_id(broker: BrokerId, index: IdBase) -> FederateId {
    if broker.0 != ROOT_BROKER_ID.0 {
        FederateId(GLOBAL_BROKER_ID_SHIFT - 3 * (broker.0 - GLOBAL_BROKER_ID_SHIFT + 2) + index)
    } else {
        FederateId(GLOBAL_BROKER_ID_SHIFT - 3 + index)
    }
}

impl InterfaceHandle {
    pub const fn new(value: IdBase) -> Self {
        Self(value)
    }

    pub const fn invalid() -> Self {
        Self(-1)
    }

    pub const fn value(&self) -> IdBase {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl Default for InterfaceHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Debug for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceHandle({})", self.0)
    }
}

impl RouteId {
    pub const fn new(value: IdBase) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> IdBase {
        self.0
    }
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({})", self.0)
    }
}

/// A composite identifier uniquely naming an interface cluster-wide: the federate that
/// owns it plus the federate-local handle. Packs into a single `u64` the way the wire
/// format does, so it can be used as a compact map key or sent on the wire without a
/// separate encoding step.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GlobalHandle {
    pub fed_id: FederateId,
    pub handle: InterfaceHandle,
}

impl GlobalHandle {
    pub const fn new(fed_id: FederateId, handle: InterfaceHandle) -> Self {
        Self { fed_id, handle }
    }

    pub const fn invalid() -> Self {
        Self {
            fed_id: FederateId::invalid(),
            handle: InterfaceHandle::invalid(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fed_id.is_valid() && self.handle.is_valid()
    }

    pub fn packed(&self) -> u64 {
        ((self.fed_id.value() as u64) << 32) | (self.handle.value() as u32 as u64)
    }
}

impl Default for GlobalHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ranges_classify_correctly() {
        assert!(ROOT_BROKER_ID.is_broker());
        assert!(!ROOT_BROKER_ID.is_federate());

        let fed = FederateId::new(GLOBAL_FEDERATE_ID_SHIFT + 5);
        assert!(fed.is_federate());
        assert!(!fed.is_broker());
        assert_eq!(fed.local_index(), 5);

        let broker = BrokerId::new(GLOBAL_BROKER_ID_SHIFT + 12);
        assert!(broker.is_broker());
        assert_eq!(broker.local_index(), 12);
    }

    #[test]
    fn invalid_sentinel_round_trips() {
        assert!(!FederateId::invalid().is_valid());
        assert!(!BrokerId::invalid().is_valid());
    }

    #[test]
    fn global_handle_packs_and_unpacks() {
        let handle = GlobalHandle::new(FederateId::new(7), InterfaceHandle::new(3));
        assert_eq!(handle.packed(), (7u64 << 32) | 3);
    }

    #[test]
    fn direct_core_id_is_distinct_from_invalid() {
        assert_ne!(DIRECT_CORE_ID.value(), FederateId::invalid().value());
    }
}
