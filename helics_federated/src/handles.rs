//! Handle manager (§4.7): owns every endpoint and filter registered with a filter
//! federate, indexed both by slot key and by name, and resolves a filter's textual
//! `target` into a concrete [`GlobalHandle`] once the target becomes known.
//!
//! Grounded on `FilterInfo.hpp`'s `target` pair (populated lazily, since a filter can be
//! registered before the endpoint it targets) and on the vector-backed `TinyMap`/
//! `TinySecondaryMap` idiom for keyed registries.

use std::collections::HashMap;

use helics_core::endpoint::{Endpoint, FilterInfo, FilterKind};
use helics_core::ids::GlobalHandle;
use helics_core::keys::{EndpointKey, FilterKey};
use tinymap::TinyMap;

/// Registry of endpoints and filters local to one filter federate.
#[derive(Default)]
pub struct HandleManager {
    endpoints: TinyMap<EndpointKey, Endpoint>,
    endpoint_names: HashMap<String, EndpointKey>,
    filters: TinyMap<FilterKey, FilterInfo>,
    filter_names: HashMap<String, FilterKey>,
    /// Filters whose `target` hasn't resolved yet because the named endpoint isn't
    /// registered, keyed by the awaited endpoint name.
    pending_targets: HashMap<String, Vec<FilterKey>>,
}

impl HandleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_endpoint(&mut self, endpoint: Endpoint) -> EndpointKey {
        let name = endpoint.name.clone();
        let key = self.endpoints.insert(endpoint);
        self.endpoint_names.insert(name.clone(), key);
        if let Some(waiting) = self.pending_targets.remove(&name) {
            for filter_key in waiting {
                self.filters[filter_key].target = name.clone();
            }
        }
        key
    }

    pub fn add_filter(&mut self, filter: FilterInfo) -> FilterKey {
        let name = filter.name.clone();
        let target = filter.target.clone();
        let key = self.filters.insert(filter);
        self.filter_names.insert(name, key);
        if !target.is_empty() && !self.endpoint_names.contains_key(&target) {
            self.pending_targets.entry(target).or_default().push(key);
        }
        key
    }

    pub fn endpoint(&self, key: EndpointKey) -> &Endpoint {
        &self.endpoints[key]
    }

    pub fn endpoint_mut(&mut self, key: EndpointKey) -> &mut Endpoint {
        &mut self.endpoints[key]
    }

    pub fn endpoint_by_name(&self, name: &str) -> Option<&Endpoint> {
        self.endpoint_names.get(name).map(|key| &self.endpoints[*key])
    }

    pub fn filter(&self, key: FilterKey) -> &FilterInfo {
        &self.filters[key]
    }

    pub fn filter_mut(&mut self, key: FilterKey) -> &mut FilterInfo {
        &mut self.filters[key]
    }

    pub fn filter_by_name(&self, name: &str) -> Option<&FilterInfo> {
        self.filter_names.get(name).map(|key| &self.filters[*key])
    }

    /// All filters attached to `endpoint_name`, in registration order, split by kind.
    pub fn filters_for_endpoint(&self, endpoint_name: &str) -> (Vec<FilterKey>, Vec<FilterKey>) {
        let mut sources = Vec::new();
        let mut dests = Vec::new();
        for (key, filter) in self.filters.iter() {
            if filter.target == endpoint_name {
                match filter.kind {
                    FilterKind::Source => sources.push(key),
                    FilterKind::Destination => dests.push(key),
                }
            }
        }
        (sources, dests)
    }

    /// Whether a filter's target has been resolved to a live endpoint yet.
    pub fn target_resolved(&self, filter_key: FilterKey) -> bool {
        let target = &self.filters[filter_key].target;
        !target.is_empty() && self.endpoint_names.contains_key(target)
    }

    pub fn global_handle_of(&self, endpoint_name: &str) -> Option<GlobalHandle> {
        self.endpoint_by_name(endpoint_name)
            .map(|ep| GlobalHandle::new(ep.owner_fed_id, ep.local_handle))
    }

    pub fn close_endpoint(&mut self, key: EndpointKey) {
        self.endpoints[key].disconnect();
    }

    pub fn close_filter(&mut self, key: FilterKey) {
        self.filters[key].close();
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Reverse lookup from a filter's local handle back to its key, used by the public
    /// ABI, which only has the handle value to identify a filter with.
    pub fn filter_key_by_handle(&self, handle: helics_core::ids::InterfaceHandle) -> Option<FilterKey> {
        self.filters.iter().find(|(_, f)| f.handle == handle).map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::ids::{FederateId, InterfaceHandle};

    fn fed() -> FederateId {
        FederateId::new(1)
    }

    #[test]
    fn endpoint_lookup_by_name() {
        let mut hm = HandleManager::new();
        let key = hm.add_endpoint(Endpoint::new("port1", fed(), InterfaceHandle::new(0)));
        assert_eq!(hm.endpoint_by_name("port1").unwrap().local_handle, hm.endpoint(key).local_handle);
        assert!(hm.endpoint_by_name("missing").is_none());
    }

    #[test]
    fn filter_target_resolves_once_endpoint_registers() {
        let mut hm = HandleManager::new();
        let mut filt = FilterInfo::new("f1", fed(), InterfaceHandle::new(0), FilterKind::Source);
        filt.target = "port1".to_string();
        let fkey = hm.add_filter(filt);
        assert!(!hm.target_resolved(fkey));

        hm.add_endpoint(Endpoint::new("port1", fed(), InterfaceHandle::new(1)));
        assert!(hm.target_resolved(fkey));
    }

    #[test]
    fn filters_for_endpoint_split_by_kind() {
        let mut hm = HandleManager::new();
        hm.add_endpoint(Endpoint::new("port1", fed(), InterfaceHandle::new(0)));
        let mut src = FilterInfo::new("src", fed(), InterfaceHandle::new(1), FilterKind::Source);
        src.target = "port1".to_string();
        let mut dst = FilterInfo::new("dst", fed(), InterfaceHandle::new(2), FilterKind::Destination);
        dst.target = "port1".to_string();
        hm.add_filter(src);
        hm.add_filter(dst);

        let (sources, dests) = hm.filters_for_endpoint("port1");
        assert_eq!(sources.len(), 1);
        assert_eq!(dests.len(), 1);
    }
}
