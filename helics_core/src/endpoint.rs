//! Endpoint and filter data model (spec §3).

use crate::ids::{FederateId, InterfaceHandle};

/// Lifecycle of an endpoint, driven by its owning federate's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Created,
    Active,
    Disconnected,
}

/// A named message interface owned by exactly one federate.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub endpoint_type: String,
    pub owner_fed_id: FederateId,
    pub local_handle: InterfaceHandle,
    pub state: EndpointState,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, owner_fed_id: FederateId, local_handle: InterfaceHandle) -> Self {
        Self {
            name: name.into(),
            endpoint_type: String::new(),
            owner_fed_id,
            local_handle,
            state: EndpointState::Created,
        }
    }

    pub fn activate(&mut self) {
        if self.state == EndpointState::Created {
            self.state = EndpointState::Active;
        }
    }

    pub fn disconnect(&mut self) {
        self.state = EndpointState::Disconnected;
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == EndpointState::Disconnected
    }
}

/// Which side of the transport a filter runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Applied at the producer side before transport.
    Source,
    /// Applied at the consumer side immediately before delivery.
    Destination,
}

/// A filter attached to an endpoint: a name, ownership, and a reference to the operator
/// variant it executes. The operator itself (and its typed configuration) lives in
/// `helics_federated`, which is the only crate that constructs and runs operators; this
/// struct only carries the bookkeeping the core data model needs to route around it.
#[derive(Debug, Clone)]
pub struct FilterInfo {
    pub name: String,
    pub core_id: FederateId,
    pub handle: InterfaceHandle,
    pub input_type: String,
    pub output_type: String,
    pub cloning: bool,
    pub disconnected: bool,
    pub kind: FilterKind,
    /// The endpoint (by name) this filter is attached to on the source side, or the
    /// delivery target for a cloning filter.
    pub target: String,
}

impl FilterInfo {
    pub fn new(name: impl Into<String>, core_id: FederateId, handle: InterfaceHandle, kind: FilterKind) -> Self {
        Self {
            name: name.into(),
            core_id,
            handle,
            input_type: String::new(),
            output_type: String::new(),
            cloning: false,
            disconnected: false,
            kind,
            target: String::new(),
        }
    }

    pub fn close(&mut self) {
        self.disconnected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_activates_from_created_only() {
        let mut ep = Endpoint::new("port1", FederateId::new(1), InterfaceHandle::new(0));
        assert_eq!(ep.state, EndpointState::Created);
        ep.activate();
        assert_eq!(ep.state, EndpointState::Active);
        ep.disconnect();
        assert!(ep.is_disconnected());
    }

    #[test]
    fn filter_close_is_idempotent() {
        let mut f = FilterInfo::new("f1", FederateId::new(1), InterfaceHandle::new(0), FilterKind::Source);
        f.close();
        f.close();
        assert!(f.disconnected);
    }
}
