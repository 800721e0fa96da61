//! The time-coordinator external collaborator (§1, §5): out of scope to respecify, but
//! this subsystem both reads its `{grantedTime, dependencies}` contract and writes back
//! the `minReturnTime` time-lock that holds a federate back while a filter operation is
//! outstanding.
//!
//! [`TimeCoordinator`] is the narrow interface this crate needs from it. Production code
//! is expected to supply a coordinator implementing the full global time algorithm;
//! [`TimeLockCoordinator`] here is a test double that only tracks the time-lock contract,
//! for exercising [`crate::filter_federate::FilterFederate`] without a real one.

use helics_core::ids::FederateId;
use helics_core::time::Time;

/// What the filter federate needs from the time coordinator: the time most recently
/// granted to a federate, the federates it depends on, and a way to report that it
/// cannot be granted a time past `min_return_time` while a filter operation is pending.
pub trait TimeCoordinator {
    /// The most recent time granted to `fed_id`.
    fn granted_time(&self, fed_id: FederateId) -> Time;

    /// Federates `fed_id` depends on for its own time advancement.
    fn dependencies(&self, fed_id: FederateId) -> Vec<FederateId>;

    /// Report that `fed_id` must not be granted a time beyond `min_return_time` until its
    /// outstanding filter operations resolve. Called every time
    /// [`crate::filter_federate::FilterFederate::min_return_time`] changes.
    fn report_time_lock(&mut self, fed_id: FederateId, min_return_time: Time);
}

/// In-memory double recording only the time-lock side of the contract, for tests that
/// need to assert a federate's time-lock invariant without a full time-coordination
/// algorithm in the loop.
#[derive(Default)]
pub struct TimeLockCoordinator {
    granted: std::collections::HashMap<FederateId, Time>,
    deps: std::collections::HashMap<FederateId, Vec<FederateId>>,
    locks: std::collections::HashMap<FederateId, Time>,
}

impl TimeLockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_granted(&mut self, fed_id: FederateId, time: Time) {
        self.granted.insert(fed_id, time);
    }

    pub fn set_dependencies(&mut self, fed_id: FederateId, deps: Vec<FederateId>) {
        self.deps.insert(fed_id, deps);
    }

    /// Whether granting `candidate` to `fed_id` would violate its recorded time-lock.
    pub fn would_violate_lock(&self, fed_id: FederateId, candidate: Time) -> bool {
        self.locks.get(&fed_id).is_some_and(|lock| candidate > *lock)
    }
}

impl TimeCoordinator for TimeLockCoordinator {
    fn granted_time(&self, fed_id: FederateId) -> Time {
        self.granted.get(&fed_id).copied().unwrap_or(Time::ZERO)
    }

    fn dependencies(&self, fed_id: FederateId) -> Vec<FederateId> {
        self.deps.get(&fed_id).cloned().unwrap_or_default()
    }

    fn report_time_lock(&mut self, fed_id: FederateId, min_return_time: Time) {
        self.locks.insert(fed_id, min_return_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_lock_blocks_grants_past_min_return_time() {
        let mut coordinator = TimeLockCoordinator::new();
        let fed = FederateId::new(1);
        coordinator.report_time_lock(fed, Time::new(2.5));
        assert!(!coordinator.would_violate_lock(fed, Time::new(2.0)));
        assert!(coordinator.would_violate_lock(fed, Time::new(3.0)));
    }

    #[test]
    fn dependencies_default_to_empty() {
        let coordinator = TimeLockCoordinator::new();
        assert!(coordinator.dependencies(FederateId::new(1)).is_empty());
    }
}
