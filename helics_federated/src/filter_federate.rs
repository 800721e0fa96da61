//! The filter federate (§4.9): the state machine that owns every endpoint and filter
//! registered against one core, runs a message through its endpoint's filter chain, and
//! tracks outstanding asynchronous filter returns.
//!
//! Grounded on `FilterFederate.hpp`. The C++ class is written against the possibility
//! that a filter's operation is itself hosted by a remote federate, so a processed
//! message may not resolve until a later `processFilterReturn`/`processDestFilterReturn`
//! call arrives; this port keeps that asynchronous-return bookkeeping
//! (`message_counter` starting at the same non-magical 54, `ongoing_filter_processes`,
//! `min_return_time`) even though every [`FilterOperation`] in this crate happens to
//! resolve synchronously, so a filter implementation that must hand off to another task
//! still has somewhere to register its pending return.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use helics_core::endpoint::{Endpoint, FilterInfo, FilterKind};
use helics_core::error::{HelicsError, Result};
use helics_core::ids::{BrokerId, FederateId, GlobalHandle, InterfaceHandle};
use helics_core::keys::{EndpointKey, FilterKey};
use helics_core::message::Message;
use helics_core::time::Time;

use crate::coordinator::FilterCoordinator;
use crate::filters::FilterOperation;
use crate::handles::HandleManager;
use crate::time_coordinator::TimeCoordinator;

/// Lifecycle of a filter federate, advanced by the broker-base loop that hosts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederateState {
    Created,
    Initializing,
    Executing,
    Finalized,
}

/// A filter return still awaited from an asynchronous filter operation.
struct PendingReturn {
    endpoint: InterfaceHandle,
    return_time: Time,
}

/// Owns the endpoints and filters registered against one core and runs messages through
/// their filter chains.
pub struct FilterFederate {
    fed_id: FederateId,
    core_id: BrokerId,
    name: String,
    state: FederateState,
    handles: HandleManager,
    coordinators: HashMap<InterfaceHandle, FilterCoordinator>,
    operations: HashMap<FilterKey, Arc<dyn FilterOperation>>,
    /// Counter for the number of filter processes started; 54 has no special meaning
    /// beyond being comfortably larger than 0 or 1, same as the source this mirrors.
    message_counter: AtomicI64,
    min_return_time: Time,
    ongoing_filter_processes: HashMap<i64, PendingReturn>,
    ongoing_dest_filter_processes: HashMap<i64, PendingReturn>,
    time_coordinator: Option<Box<dyn TimeCoordinator + Send>>,
}

impl FilterFederate {
    pub fn new(fed_id: FederateId, name: impl Into<String>, core_id: BrokerId) -> Self {
        Self {
            fed_id,
            core_id,
            name: name.into(),
            state: FederateState::Created,
            handles: HandleManager::new(),
            coordinators: HashMap::new(),
            operations: HashMap::new(),
            message_counter: AtomicI64::new(54),
            min_return_time: Time::MAX,
            ongoing_filter_processes: HashMap::new(),
            ongoing_dest_filter_processes: HashMap::new(),
            time_coordinator: None,
        }
    }

    /// Attach the time coordinator that `min_return_time` changes are reported to. Not
    /// required: a federate with no coordinator attached still tracks its own time-lock
    /// state, it just has nowhere external to publish it.
    pub fn set_time_coordinator(&mut self, coordinator: Box<dyn TimeCoordinator + Send>) {
        self.time_coordinator = Some(coordinator);
    }

    pub fn fed_id(&self) -> FederateId {
        self.fed_id
    }

    pub fn core_id(&self) -> BrokerId {
        self.core_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> FederateState {
        self.state
    }

    /// Advance the state machine. Only the forward transitions
    /// Created->Initializing->Executing->Finalized are legal; anything else is a no-op
    /// that the caller should treat as a logic error.
    pub fn enter_initializing(&mut self) -> Result<()> {
        self.transition(FederateState::Created, FederateState::Initializing)
    }

    pub fn enter_executing(&mut self) -> Result<()> {
        self.transition(FederateState::Initializing, FederateState::Executing)
    }

    pub fn finalize(&mut self) -> Result<()> {
        self.transition(FederateState::Executing, FederateState::Finalized)
    }

    fn transition(&mut self, from: FederateState, to: FederateState) -> Result<()> {
        if self.state != from {
            return Err(HelicsError::InvalidFunctionCall(format!(
                "cannot transition from {:?} to {:?} while in {:?}",
                from, to, self.state
            )));
        }
        self.state = to;
        Ok(())
    }

    pub fn register_endpoint(&mut self, name: impl Into<String>, local_handle: InterfaceHandle) -> EndpointKey {
        self.handles.add_endpoint(Endpoint::new(name, self.fed_id, local_handle))
    }

    /// Number of endpoints and filters registered so far, usable by a caller across the
    /// public ABI as a source of fresh, never-reused local handle values.
    pub fn handle_count(&self) -> i64 {
        (self.handles.endpoint_count() + self.handles.filter_count()) as i64
    }

    /// Look up the local handle a filter was registered with.
    pub fn filter_handle(&self, key: FilterKey) -> Option<InterfaceHandle> {
        Some(self.handles.filter(key).handle)
    }

    /// Set a numeric property on a previously registered filter, looked up by its local
    /// handle rather than its key (the form the public ABI has available).
    pub fn set_filter_property(&self, handle: InterfaceHandle, property: &str, value: f64) -> Result<()> {
        let key = self
            .handles
            .filter_key_by_handle(handle)
            .ok_or_else(|| HelicsError::InvalidIdentifier(format!("no filter with handle {}", handle.value())))?;
        let operation = self
            .operations
            .get(&key)
            .ok_or_else(|| HelicsError::InvalidIdentifier(format!("no filter with handle {}", handle.value())))?;
        operation.set(property, value)
    }

    /// Register a filter and record its operator implementation. `target` names the
    /// endpoint this filter is attached to; it may not be registered yet.
    pub fn create_filter(
        &mut self,
        name: impl Into<String>,
        handle: InterfaceHandle,
        kind: FilterKind,
        target: impl Into<String>,
        cloning: bool,
        operation: Arc<dyn FilterOperation>,
    ) -> FilterKey {
        let mut info = FilterInfo::new(name, self.fed_id, handle, kind);
        info.target = target.into();
        info.cloning = cloning;
        let target_handle = self.endpoint_handle(&info.target);
        let key = self.handles.add_filter(info);
        self.operations.insert(key, operation);

        if let Some(endpoint_handle) = target_handle {
            let coord = self.coordinators.entry(endpoint_handle).or_default();
            match kind {
                FilterKind::Source => coord.push_source_filter(key, cloning),
                FilterKind::Destination => coord.set_dest_filter(key, cloning),
            }
        }
        key
    }

    fn endpoint_handle(&self, name: &str) -> Option<InterfaceHandle> {
        self.handles.endpoint_by_name(name).map(|ep| ep.local_handle)
    }

    /// Close the filter identified by `handle` (§4.8): walks every coordinator's filter
    /// lists looking for a match, and flags each one found as disconnected so it's
    /// skipped by `process_message`/`destination_process_message` from then on and
    /// traversed as identity. Idempotent: closing an already-disconnected filter again
    /// still succeeds, since the coordinator lists are never pruned on close.
    pub fn close_filter(&mut self, handle: GlobalHandle) -> Result<()> {
        if handle.fed_id != self.fed_id {
            return Err(HelicsError::InvalidIdentifier(format!(
                "no filter with handle {:?} on federate {:?}",
                handle, self.fed_id
            )));
        }
        let fed_id = self.fed_id;
        let handles = &self.handles;
        let resolve = |key: FilterKey| GlobalHandle::new(fed_id, handles.filter(key).handle);

        let mut closed = Vec::new();
        for coordinator in self.coordinators.values() {
            closed.extend(coordinator.close_filter(handle, resolve));
        }
        if closed.is_empty() {
            return Err(HelicsError::InvalidIdentifier(format!("no filter with handle {:?}", handle)));
        }
        for key in closed {
            self.handles.close_filter(key);
        }
        Ok(())
    }

    fn next_process_id(&self) -> i64 {
        self.message_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Run a message that just arrived at an endpoint's source side through its source
    /// filter chain, returning the (possibly rewritten) primary message if it wasn't
    /// dropped, plus any clones produced along the way.
    pub fn process_message(&mut self, endpoint_name: &str, mut message: Message) -> (Option<Message>, Vec<Message>) {
        let Some(endpoint_handle) = self.endpoint_handle(endpoint_name) else {
            return (Some(message), Vec::new());
        };
        let Some((source_filters, all_source_filters)) = self
            .coordinators
            .get(&endpoint_handle)
            .map(|coord| (coord.source_filters.clone(), coord.all_source_filters.clone()))
        else {
            return (Some(message), Vec::new());
        };

        let mut clones = Vec::new();
        for filter_key in &source_filters {
            if self.handles.filter(*filter_key).disconnected {
                continue;
            }
            let Some(op) = self.operations.get(filter_key).cloned() else { continue };
            let process_id = self.next_process_id();
            self.generate_process_marker(endpoint_handle, process_id, message.time);
            let output = op.process(message);
            self.accept_process_return(process_id);
            clones.extend(output.cloned);
            match output.primary {
                Some(m) => message = m,
                None => return (None, clones),
            }
        }

        for filter_key in &all_source_filters {
            if source_filters.contains(filter_key) {
                continue;
            }
            if self.handles.filter(*filter_key).disconnected {
                continue;
            }
            if let Some(op) = self.operations.get(filter_key).cloned() {
                let output = op.process(message.clone());
                clones.extend(output.cloned);
            }
        }

        (Some(message), clones)
    }

    /// Run a message immediately before delivery through its destination's filter and
    /// any cloning destination filters. Returns `true` if the original message should
    /// still be delivered to the owning federate.
    pub fn destination_process_message(&mut self, endpoint_name: &str, message: &Message) -> (bool, Vec<Message>) {
        let Some(endpoint_handle) = self.endpoint_handle(endpoint_name) else {
            return (true, Vec::new());
        };
        let Some((cloning_dest_filters, dest_filter)) = self
            .coordinators
            .get(&endpoint_handle)
            .map(|coord| (coord.cloning_dest_filters.clone(), coord.dest_filter))
        else {
            return (true, Vec::new());
        };

        let mut clones = Vec::new();
        for filter_key in &cloning_dest_filters {
            if self.handles.filter(*filter_key).disconnected {
                continue;
            }
            if let Some(op) = self.operations.get(filter_key).cloned() {
                let output = op.process(message.clone());
                clones.extend(output.cloned);
            }
        }

        let deliver = match dest_filter {
            Some(filter_key) if !self.handles.filter(filter_key).disconnected => {
                let Some(op) = self.operations.get(&filter_key).cloned() else { return (true, clones) };
                let process_id = self.next_process_id();
                self.generate_dest_process_marker(endpoint_handle, process_id, message.time);
                let output = op.process(message.clone());
                self.accept_dest_process_return(process_id);
                output.primary.is_some()
            }
            _ => true,
        };
        (deliver, clones)
    }

    fn generate_process_marker(&mut self, endpoint: InterfaceHandle, process_id: i64, return_time: Time) {
        self.ongoing_filter_processes.insert(process_id, PendingReturn { endpoint, return_time });
        if let Some(coord) = self.coordinators.get_mut(&endpoint) {
            coord.begin_source_transaction();
        }
        self.recompute_min_return_time();
    }

    fn accept_process_return(&mut self, process_id: i64) {
        if let Some(pending) = self.ongoing_filter_processes.remove(&process_id) {
            if let Some(coord) = self.coordinators.get_mut(&pending.endpoint) {
                coord.end_source_transaction();
            }
        }
        self.recompute_min_return_time();
    }

    fn generate_dest_process_marker(&mut self, endpoint: InterfaceHandle, process_id: i64, return_time: Time) {
        self.ongoing_dest_filter_processes.insert(process_id, PendingReturn { endpoint, return_time });
        if let Some(coord) = self.coordinators.get_mut(&endpoint) {
            coord.begin_dest_transaction();
        }
        self.recompute_min_return_time();
    }

    fn accept_dest_process_return(&mut self, process_id: i64) {
        if let Some(pending) = self.ongoing_dest_filter_processes.remove(&process_id) {
            if let Some(coord) = self.coordinators.get_mut(&pending.endpoint) {
                coord.end_dest_transaction();
            }
        }
        self.recompute_min_return_time();
    }

    fn recompute_min_return_time(&mut self) {
        self.min_return_time = self
            .ongoing_filter_processes
            .values()
            .chain(self.ongoing_dest_filter_processes.values())
            .map(|p| p.return_time)
            .fold(Time::MAX, Time::min);
        if let Some(coordinator) = self.time_coordinator.as_mut() {
            coordinator.report_time_lock(self.fed_id, self.min_return_time);
        }
    }

    pub fn min_return_time(&self) -> Time {
        self.min_return_time
    }

    pub fn has_outstanding_filter_processes(&self) -> bool {
        !self.ongoing_filter_processes.is_empty() || !self.ongoing_dest_filter_processes.is_empty()
    }

    /// Resolve a source-side filter return arriving asynchronously for `process_id`
    /// (`processFilterReturn`, §4.9): clears the pending marker, recomputing
    /// `min_return_time`, and hands back `result` for the caller to deliver onward (or
    /// not, if the filter dropped the message).
    pub fn process_filter_return(&mut self, process_id: i64, result: Option<Message>) -> Option<Message> {
        self.accept_process_return(process_id);
        result
    }

    /// Resolve a destination-side filter return arriving asynchronously for
    /// `process_id` (`processDestFilterReturn`, §4.9): clears the pending marker and
    /// reports whether the original message should still be delivered.
    pub fn process_dest_filter_return(&mut self, process_id: i64, result: Option<Message>) -> bool {
        self.accept_dest_process_return(process_id);
        result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::DelayFilter;
    use helics_core::time::Time;

    fn filtered_federate() -> (FilterFederate, InterfaceHandle) {
        let mut ff = FilterFederate::new(FederateId::new(1), "filters", BrokerId::new(1));
        let handle = InterfaceHandle::new(0);
        ff.register_endpoint("port2", handle);

        let delay = Arc::new(DelayFilter::default());
        delay.set("delay", 2.5).unwrap();
        ff.create_filter("delayFilter", InterfaceHandle::new(1), FilterKind::Source, "port2", false, delay);
        (ff, handle)
    }

    #[test]
    fn process_message_applies_source_filter_chain() {
        let (mut ff, _) = filtered_federate();
        let msg = Message::new("port1", "port2", vec![b'a'; 500], Time::ZERO);
        let (out, clones) = ff.process_message("port2", msg);
        assert_eq!(out.unwrap().time, Time::new(2.5));
        assert!(clones.is_empty());
    }

    #[test]
    fn closed_filter_is_traversed_as_identity() {
        let (mut ff, _) = filtered_federate();
        let filter_handle = GlobalHandle::new(ff.fed_id(), InterfaceHandle::new(1));
        ff.close_filter(filter_handle).unwrap();

        let msg = Message::new("port1", "port2", vec![b'a'; 500], Time::ZERO);
        let (out, clones) = ff.process_message("port2", msg);
        assert_eq!(out.unwrap().time, Time::ZERO);
        assert!(clones.is_empty());
    }

    #[test]
    fn closing_a_filter_twice_is_idempotent() {
        let (mut ff, _) = filtered_federate();
        let filter_handle = GlobalHandle::new(ff.fed_id(), InterfaceHandle::new(1));
        ff.close_filter(filter_handle).unwrap();
        ff.close_filter(filter_handle).unwrap();
    }

    #[test]
    fn closing_an_unknown_filter_handle_errors() {
        let (mut ff, _) = filtered_federate();
        let bogus = GlobalHandle::new(ff.fed_id(), InterfaceHandle::new(99));
        assert!(ff.close_filter(bogus).is_err());
    }

    #[test]
    fn process_message_with_no_filters_passes_through() {
        let mut ff = FilterFederate::new(FederateId::new(1), "filters", BrokerId::new(1));
        ff.register_endpoint("port2", InterfaceHandle::new(0));
        let msg = Message::new("port1", "port2", vec![], Time::ZERO);
        let (out, clones) = ff.process_message("port2", msg.clone());
        assert_eq!(out.unwrap().payload, msg.payload);
        assert!(clones.is_empty());
    }

    #[test]
    fn process_message_tracks_and_clears_min_return_time() {
        let (mut ff, _) = filtered_federate();
        assert_eq!(ff.min_return_time(), Time::MAX);
        let msg = Message::new("port1", "port2", vec![], Time::new(3.0));
        ff.process_message("port2", msg);
        assert!(!ff.has_outstanding_filter_processes());
        assert_eq!(ff.min_return_time(), Time::MAX);
    }

    #[test]
    fn process_filter_return_clears_the_pending_marker() {
        let (mut ff, endpoint) = filtered_federate();
        ff.generate_process_marker(endpoint, 1000, Time::new(5.0));
        assert_eq!(ff.min_return_time(), Time::new(5.0));

        let msg = Message::new("port1", "port2", vec![], Time::new(5.0));
        let delivered = ff.process_filter_return(1000, Some(msg.clone()));
        assert_eq!(delivered.unwrap().payload, msg.payload);
        assert!(!ff.has_outstanding_filter_processes());
        assert_eq!(ff.min_return_time(), Time::MAX);
    }

    #[test]
    fn process_dest_filter_return_reports_drop_as_no_delivery() {
        let (mut ff, endpoint) = filtered_federate();
        ff.generate_dest_process_marker(endpoint, 2000, Time::new(1.0));
        assert!(!ff.process_dest_filter_return(2000, None));
        assert!(!ff.has_outstanding_filter_processes());
    }

    #[test]
    fn state_machine_only_advances_forward() {
        let mut ff = FilterFederate::new(FederateId::new(1), "f", BrokerId::new(1));
        assert!(ff.enter_initializing().is_ok());
        assert!(ff.enter_executing().is_ok());
        assert!(ff.enter_initializing().is_err());
        assert!(ff.finalize().is_ok());
        assert_eq!(ff.state(), FederateState::Finalized);
    }
}
