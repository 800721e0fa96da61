//! Filter coordinator (§4.8): the per-endpoint ordering of attached filters and the
//! bookkeeping for how many asynchronous filter returns are still outstanding.
//!
//! Grounded directly on `FilterCoordinator.hpp`/`.cpp`: an ordered `sourceFilters` chain
//! distinct from `allSourceFilters` (the unsorted registration order, kept so a filter
//! closed mid-flight can still be found), a single `destFilter`, a separate
//! `cloningDestFilters` list (cloning filters never sit in the ordered chain — every one
//! of them runs, not just the first), and two outstanding-transaction counters.

use helics_core::ids::GlobalHandle;
use helics_core::keys::FilterKey;

/// Tracks the filters attached to one endpoint and how many of their async returns are
/// still in flight.
#[derive(Default)]
pub struct FilterCoordinator {
    /// Ordered chain of non-cloning source filters, applied in sequence.
    pub source_filters: Vec<FilterKey>,
    /// The single non-cloning destination filter, if any.
    pub dest_filter: Option<FilterKey>,
    /// Every source filter registered against this endpoint, cloning or not, in
    /// registration order. Used to find a filter by handle when closing it even after
    /// `source_filters` has been reordered.
    pub all_source_filters: Vec<FilterKey>,
    /// Cloning filters attached on the destination side; every one of these runs
    /// independently, producing its own clone, rather than forming a chain.
    pub cloning_dest_filters: Vec<FilterKey>,
    /// Number of source-side filter returns still outstanding.
    pub ongoing_source_transactions: u32,
    /// Number of destination-side filter returns still outstanding.
    pub ongoing_dest_transactions: u32,
}

impl FilterCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_source_filters(&self) -> bool {
        !self.source_filters.is_empty()
    }

    pub fn has_dest_filters(&self) -> bool {
        self.dest_filter.is_some() || !self.cloning_dest_filters.is_empty()
    }

    pub fn push_source_filter(&mut self, key: FilterKey, cloning: bool) {
        self.all_source_filters.push(key);
        if !cloning {
            self.source_filters.push(key);
        }
    }

    pub fn set_dest_filter(&mut self, key: FilterKey, cloning: bool) {
        if cloning {
            self.cloning_dest_filters.push(key);
        } else {
            self.dest_filter = Some(key);
        }
    }

    pub fn begin_source_transaction(&mut self) {
        self.ongoing_source_transactions += 1;
    }

    pub fn end_source_transaction(&mut self) {
        self.ongoing_source_transactions = self.ongoing_source_transactions.saturating_sub(1);
    }

    pub fn begin_dest_transaction(&mut self) {
        self.ongoing_dest_transactions += 1;
    }

    pub fn end_dest_transaction(&mut self) {
        self.ongoing_dest_transactions = self.ongoing_dest_transactions.saturating_sub(1);
    }

    pub fn is_quiescent(&self) -> bool {
        self.ongoing_source_transactions == 0 && self.ongoing_dest_transactions == 0
    }

    /// Mark every filter matching `target` as disconnected, reporting which filter keys
    /// were affected so the caller can flag them in its own registry.
    pub fn close_filter(&self, target: GlobalHandle, resolve: impl Fn(FilterKey) -> GlobalHandle) -> Vec<FilterKey> {
        let mut closed = Vec::new();
        if let Some(dest) = self.dest_filter {
            if resolve(dest) == target {
                closed.push(dest);
            }
        }
        for &key in self.all_source_filters.iter().chain(self.cloning_dest_filters.iter()) {
            if resolve(key) == target {
                closed.push(key);
            }
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::ids::{FederateId, InterfaceHandle};
    use tinymap::TinyMap;

    #[test]
    fn ordered_chain_excludes_cloning_filters() {
        let mut fc = FilterCoordinator::new();
        let mut keys = TinyMap::<FilterKey, ()>::new();
        let k1 = keys.insert(());
        let k2 = keys.insert(());
        fc.push_source_filter(k1, false);
        fc.push_source_filter(k2, true);
        assert_eq!(fc.source_filters, vec![k1]);
        assert_eq!(fc.all_source_filters, vec![k1, k2]);
    }

    #[test]
    fn transaction_counters_never_go_negative() {
        let mut fc = FilterCoordinator::new();
        fc.end_source_transaction();
        assert_eq!(fc.ongoing_source_transactions, 0);
        fc.begin_source_transaction();
        assert!(!fc.is_quiescent());
        fc.end_source_transaction();
        assert!(fc.is_quiescent());
    }

    #[test]
    fn close_filter_matches_by_resolved_handle() {
        let mut fc = FilterCoordinator::new();
        let mut keys = TinyMap::<FilterKey, GlobalHandle>::new();
        let fed = FederateId::new(5);
        let target = GlobalHandle::new(fed, InterfaceHandle::new(2));
        let k1 = keys.insert(target);
        let k2 = keys.insert(GlobalHandle::new(fed, InterfaceHandle::new(3)));
        fc.push_source_filter(k1, false);
        fc.push_source_filter(k2, false);

        let closed = fc.close_filter(target, |k| keys[k]);
        assert_eq!(closed, vec![k1]);
    }
}
