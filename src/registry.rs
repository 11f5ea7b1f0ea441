//! The discovery proxy registry.
//!
//! Owns the endpoint map and the replica counter table behind two nested
//! locks. The endpoint lock is always taken first; the counter lock is only
//! ever acquired while it is held.

use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::annotations::{stamp_id, ServiceAnnotations};
use crate::config::ProxyConfig;
use crate::counters::IdentityCounters;
use crate::error::{Error, Result};
use crate::matcher::{self, Matches, ResolveCriteria};
use crate::metadata::{EndpointAddress, EndpointMetadata};

/// A registered endpoint and its parsed annotations.
#[derive(Debug)]
struct Entry {
    metadata: EndpointMetadata,
    service: ServiceAnnotations,
}

type Endpoints = BTreeMap<EndpointAddress, Entry>;

/// In-memory registry answering announcements, find and resolve.
///
/// Every operation completes synchronously and is safe to call from many
/// threads at once. Share it behind an `Arc`.
///
/// ```
/// use discovery_proxy::{DiscoveryProxy, EndpointMetadata, FindCriteria, ResolveCriteria};
///
/// let proxy = DiscoveryProxy::new();
/// proxy.register_online(
///     EndpointMetadata::new("http://host/scheduler")
///         .with_contract_type("ns:IScheduler")
///         .with_annotation("Name", "Scheduler")
///         .with_annotation("Children", "Worker"),
/// )?;
/// proxy.register_online(
///     EndpointMetadata::new("http://host/worker/0")
///         .with_annotation("Name", "Worker")
///         .with_annotation("Parent", "Scheduler"),
/// )?;
///
/// let worker = proxy.resolve(&ResolveCriteria::new("http://host/worker/0"));
/// assert_eq!(worker.unwrap().annotation("ID"), Some("0"));
/// assert_eq!(proxy.find(&FindCriteria::new().contract_type("ns:IScheduler")).len(), 1);
/// # Ok::<(), discovery_proxy::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct DiscoveryProxy {
    config: ProxyConfig,
    endpoints: Mutex<Endpoints>,
    counters: Mutex<IdentityCounters>,
}

impl DiscoveryProxy {
    /// Create an empty registry with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given configuration.
    pub fn with_config(config: ProxyConfig) -> Self {
        Self {
            config,
            endpoints: Mutex::new(BTreeMap::new()),
            counters: Mutex::new(IdentityCounters::default()),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Handle an online announcement.
    ///
    /// A replica (non-empty `Parent`) receives the next ordinal for its
    /// `Name` as an `ID` annotation and fails with
    /// [`Error::NoParentRegistered`] if no parent seeded that name. Any other
    /// endpoint replaces a registered endpoint with the same `Name`. An
    /// endpoint already registered at the same address is removed first. Child
    /// names listed under `Children` restart numbering at zero. Nothing
    /// changes when an error is returned.
    pub fn register_online(&self, mut metadata: EndpointMetadata) -> Result<()> {
        if metadata.annotations.is_empty() {
            warn!(address = %metadata.address, "rejecting announcement without annotations");
            return Err(Error::InvalidEndpoint);
        }

        let keys = &self.config.keys;
        let mut service = ServiceAnnotations::from_metadata(&metadata, keys);
        let address = metadata.effective_address().clone();

        let mut endpoints = self.endpoints.lock();

        if service.is_replica() {
            match self.lock_counters(&endpoints).take_next(&service.name) {
                Some(id) => service.assigned_id = Some(id),
                None => {
                    warn!(
                        name = %service.name,
                        parent = %service.parent,
                        %address,
                        "rejecting replica: no parent registered"
                    );
                    return Err(Error::no_parent(service.name));
                }
            }
        } else if self.config.supersede_by_name && !service.name.is_empty() {
            let stale = endpoints
                .iter()
                .find(|(_, entry)| entry.service.name == service.name)
                .map(|(addr, _)| addr.clone());
            if let Some(stale) = stale {
                debug!(name = %service.name, %stale, %address, "superseding stale registration");
                self.remove_locked(&mut endpoints, &stale);
            }
        }

        if endpoints.contains_key(&address) {
            debug!(%address, "displacing endpoint at the same address");
            self.remove_locked(&mut endpoints, &address);
        }

        if !service.children.is_empty() {
            let mut counters = self.lock_counters(&endpoints);
            for child in &service.children {
                counters.seed(child);
            }
            debug!(children = ?service.children, "seeded replica counters");
        }

        if let Some(id) = service.assigned_id {
            stamp_id(&mut metadata, keys, id);
        }

        log_change(&metadata, &address, "Adding");
        endpoints.insert(address, Entry { metadata, service });
        Ok(())
    }

    /// Handle an offline announcement.
    ///
    /// Unknown endpoints are ignored. The counters for the removed endpoint's
    /// own name and for each of its children are dropped once no registered
    /// endpoint carries that name or lists it as a child.
    pub fn register_offline(&self, metadata: &EndpointMetadata) {
        let address = metadata.effective_address();
        let mut endpoints = self.endpoints.lock();
        if self.remove_locked(&mut endpoints, address).is_none() {
            debug!(%address, "offline announcement for unknown endpoint");
        }
    }

    /// All registered endpoints matching `criteria`, in address order.
    pub fn find<C>(&self, criteria: &C) -> Vec<EndpointMetadata>
    where
        C: Matches + ?Sized,
    {
        let endpoints = self.endpoints.lock();
        matcher::find(criteria, endpoints.values().map(|entry| &entry.metadata))
    }

    /// The endpoint registered at the criteria's address, if any.
    pub fn resolve(&self, criteria: &ResolveCriteria) -> Option<EndpointMetadata> {
        let endpoints = self.endpoints.lock();
        matcher::resolve(criteria, endpoints.values().map(|entry| &entry.metadata))
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.lock().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.lock().is_empty()
    }

    /// Next ordinal that would be handed to a replica named `name`.
    pub fn counter(&self, name: &str) -> Option<u32> {
        let endpoints = self.endpoints.lock();
        let counters = self.lock_counters(&endpoints);
        counters.get(name)
    }

    /// Forget every endpoint and counter.
    pub fn clear(&self) {
        let mut endpoints = self.endpoints.lock();
        self.lock_counters(&endpoints).clear();
        let dropped = endpoints.len();
        endpoints.clear();
        info!(dropped, "cleared registry");
    }

    /// Lock the counter table. Requires the endpoint map to be locked already.
    fn lock_counters<'a>(&'a self, _held: &Endpoints) -> MutexGuard<'a, IdentityCounters> {
        self.counters.lock()
    }

    fn remove_locked(&self, endpoints: &mut Endpoints, address: &EndpointAddress) -> Option<Entry> {
        let removed = endpoints.remove(address)?;

        let mut counters = self.lock_counters(endpoints);
        let names = std::iter::once(&removed.service.name).chain(&removed.service.children);
        for name in names.filter(|name| !name.is_empty()) {
            if !is_claimed(endpoints, name) && counters.remove(name) {
                debug!(%name, "dropped replica counter");
            }
        }
        drop(counters);

        log_change(&removed.metadata, address, "Removing");
        Some(removed)
    }
}

/// True if a registered endpoint carries `name` or lists it as a child.
fn is_claimed(endpoints: &Endpoints, name: &str) -> bool {
    endpoints
        .values()
        .any(|entry| entry.service.name == name || entry.service.children.iter().any(|c| c == name))
}

fn log_change(metadata: &EndpointMetadata, address: &EndpointAddress, verb: &'static str) {
    info!(
        %address,
        contract = metadata.primary_contract().unwrap_or("<none>"),
        "{verb} service"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::FindCriteria;

    fn parent(addr: &str, name: &str, children: &str) -> EndpointMetadata {
        EndpointMetadata::new(addr)
            .with_annotation("Name", name)
            .with_annotation("Children", children)
    }

    fn replica(addr: &str, name: &str, parent: &str) -> EndpointMetadata {
        EndpointMetadata::new(addr)
            .with_annotation("Name", name)
            .with_annotation("Parent", parent)
    }

    fn resolve(proxy: &DiscoveryProxy, addr: &str) -> Option<EndpointMetadata> {
        proxy.resolve(&ResolveCriteria::new(addr))
    }

    #[test]
    fn rejects_endpoint_without_annotations() {
        let proxy = DiscoveryProxy::new();
        let err = proxy
            .register_online(EndpointMetadata::new("http://host/a"))
            .unwrap_err();
        assert_eq!(err, Error::InvalidEndpoint);
        assert!(proxy.is_empty());
    }

    #[test]
    fn replica_without_parent_is_rejected() {
        let proxy = DiscoveryProxy::new();
        let err = proxy
            .register_online(replica("http://host/b0", "B", "A"))
            .unwrap_err();
        assert_eq!(err, Error::no_parent("B"));
        assert!(proxy.is_empty());
        assert_eq!(proxy.counter("B"), None);
    }

    #[test]
    fn replicas_are_numbered_in_order() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B C")).unwrap();
        assert_eq!(proxy.counter("B"), Some(0));
        assert_eq!(proxy.counter("C"), Some(0));

        proxy.register_online(replica("http://host/b0", "B", "A")).unwrap();
        proxy.register_online(replica("http://host/b1", "B", "A")).unwrap();

        let b0 = resolve(&proxy, "http://host/b0").unwrap();
        let b1 = resolve(&proxy, "http://host/b1").unwrap();
        assert_eq!(b0.annotation("ID"), Some("0"));
        assert_eq!(b1.annotation("ID"), Some("1"));
        assert_eq!(proxy.counter("B"), Some(2));
        assert_eq!(proxy.counter("C"), Some(0));
    }

    #[test]
    fn announced_id_is_overwritten() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();
        proxy
            .register_online(replica("http://host/b0", "B", "A").with_annotation("ID", "99"))
            .unwrap();

        let b0 = resolve(&proxy, "http://host/b0").unwrap();
        let ids: Vec<_> = b0.annotations.iter().filter(|a| a.name == "ID").collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].value, "0");
    }

    #[test]
    fn same_name_supersedes_previous_registration() {
        let proxy = DiscoveryProxy::new();
        proxy
            .register_online(EndpointMetadata::new("http://old/x").with_annotation("Name", "X"))
            .unwrap();
        proxy
            .register_online(EndpointMetadata::new("http://new/x").with_annotation("Name", "X"))
            .unwrap();

        assert_eq!(proxy.len(), 1);
        assert!(resolve(&proxy, "http://old/x").is_none());
        assert!(resolve(&proxy, "http://new/x").is_some());
    }

    #[test]
    fn supersession_can_be_disabled() {
        let proxy = DiscoveryProxy::with_config(ProxyConfig::default().supersede_by_name(false));
        proxy
            .register_online(EndpointMetadata::new("http://old/x").with_annotation("Name", "X"))
            .unwrap();
        proxy
            .register_online(EndpointMetadata::new("http://new/x").with_annotation("Name", "X"))
            .unwrap();

        assert!(!proxy.config().supersede_by_name);
        assert_eq!(proxy.len(), 2);
    }

    #[test]
    fn overwriting_address_releases_displaced_children() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/x", "A", "B")).unwrap();
        assert_eq!(proxy.counter("B"), Some(0));

        proxy
            .register_online(EndpointMetadata::new("http://host/x").with_annotation("Name", "Z"))
            .unwrap();

        assert_eq!(proxy.len(), 1);
        assert_eq!(proxy.counter("B"), None);
        let survivor = resolve(&proxy, "http://host/x").unwrap();
        assert_eq!(survivor.annotation("Name"), Some("Z"));
    }

    #[test]
    fn last_replica_after_parent_drops_counter() {
        let proxy = DiscoveryProxy::new();
        let a = parent("http://host/a", "A", "B");
        let b0 = replica("http://host/b0", "B", "A");
        proxy.register_online(a.clone()).unwrap();
        proxy.register_online(b0.clone()).unwrap();

        proxy.register_offline(&a);
        assert_eq!(proxy.counter("B"), Some(1));

        proxy.register_offline(&b0);
        assert_eq!(proxy.counter("B"), None);
    }

    #[test]
    fn replica_removal_keeps_counter_while_parent_lists_it() {
        let proxy = DiscoveryProxy::new();
        let b0 = replica("http://host/b0", "B", "A");
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();
        proxy.register_online(b0.clone()).unwrap();

        proxy.register_offline(&b0);
        assert_eq!(proxy.counter("B"), Some(1));
    }

    #[test]
    fn nameless_endpoints_do_not_supersede_each_other() {
        let proxy = DiscoveryProxy::new();
        proxy
            .register_online(EndpointMetadata::new("http://host/a").with_annotation("Tag", "a"))
            .unwrap();
        proxy
            .register_online(EndpointMetadata::new("http://host/b").with_annotation("Tag", "b"))
            .unwrap();

        assert_eq!(proxy.len(), 2);
    }

    #[test]
    fn reannouncing_parent_reseeds_children() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();
        proxy.register_online(replica("http://host/b0", "B", "A")).unwrap();
        assert_eq!(proxy.counter("B"), Some(1));

        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();
        assert_eq!(proxy.counter("B"), Some(0));
    }

    #[test]
    fn reannouncing_parent_without_children_keeps_counter() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();
        proxy.register_online(parent("http://host/a2", "A", "B")).unwrap();

        assert_eq!(proxy.len(), 1);
        assert_eq!(proxy.counter("B"), Some(0));
        proxy.register_online(replica("http://host/b0", "B", "A")).unwrap();
    }

    #[test]
    fn offline_collects_each_child_counter_independently() {
        let proxy = DiscoveryProxy::new();
        let a = parent("http://host/a", "A", "B C D");
        proxy.register_online(a.clone()).unwrap();
        proxy.register_online(replica("http://host/c0", "C", "A")).unwrap();

        proxy.register_offline(&a);

        assert_eq!(proxy.counter("B"), None);
        assert_eq!(proxy.counter("C"), Some(1));
        assert_eq!(proxy.counter("D"), None);
    }

    #[test]
    fn offline_for_unknown_endpoint_is_noop() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();

        proxy.register_offline(&parent("http://elsewhere/a", "A", "B"));

        assert_eq!(proxy.len(), 1);
        assert_eq!(proxy.counter("B"), Some(0));
    }

    #[test]
    fn offline_uses_effective_address() {
        let proxy = DiscoveryProxy::new();
        let meta = EndpointMetadata::new("urn:a")
            .with_listen_address("net.tcp://host/a")
            .with_annotation("Name", "A");
        proxy.register_online(meta.clone()).unwrap();
        assert!(resolve(&proxy, "net.tcp://host/a").is_some());

        proxy.register_offline(&meta);
        assert!(proxy.is_empty());
    }

    #[test]
    fn failed_announcement_changes_nothing() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();

        let orphan = replica("http://host/z", "Z", "A").with_annotation("Children", "Q");
        assert!(proxy.register_online(orphan).is_err());

        assert_eq!(proxy.len(), 1);
        assert_eq!(proxy.counter("Q"), None);
        assert_eq!(proxy.counter("B"), Some(0));
    }

    #[test]
    fn clear_drops_everything() {
        let proxy = DiscoveryProxy::new();
        proxy.register_online(parent("http://host/a", "A", "B")).unwrap();
        proxy.clear();

        assert!(proxy.is_empty());
        assert_eq!(proxy.counter("B"), None);
        assert!(proxy.find(&FindCriteria::new()).is_empty());
    }
}
