//! SchedulerCache: the record store the placement engine commits into.
//!
//! [`InMemoryCache`] keeps clusters, namespaces and pods behind a single
//! `RwLock` and derives scheduling snapshots from them on demand. Every
//! mutation is a whole-record insert or remove, so a guard recovered from
//! a poisoned lock still sees consistent data.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::snapshot::{ClusterUsage, NamespaceSnapshot, PodSnapshot};
use crate::types::*;

/// Storage and snapshot interface consumed by the scheduling engine.
pub trait SchedulerCache: Send + Sync {
    fn get_namespace(&self, key: &str) -> Option<Namespace>;

    fn get_pod(&self, key: &str) -> Option<Pod>;

    fn add_namespace(&self, namespace: &Namespace) -> CacheResult<()>;

    /// Replace `old` with `new`. Fails if the cached record no longer equals `old`.
    fn update_namespace(&self, old: &Namespace, new: &Namespace) -> CacheResult<()>;

    fn remove_namespace(&self, namespace: &Namespace);

    fn add_pod(&self, pod: &Pod) -> CacheResult<()>;

    fn remove_pod(&self, pod: &Pod);

    /// Cluster usage for placing a namespace. `current` (the namespace's
    /// cached record, if any) is left out of the allocation totals.
    fn snapshot_for_namespace(&self, current: Option<&Namespace>) -> CacheResult<NamespaceSnapshot>;

    /// Namespace-scoped usage for placing `pod`.
    fn snapshot_for_pod(&self, pod: &Pod) -> CacheResult<PodSnapshot>;
}

#[derive(Default)]
struct CacheState {
    clusters: BTreeMap<ClusterId, Cluster>,
    namespaces: HashMap<String, Namespace>,
    pods: HashMap<String, Pod>,
}

impl CacheState {
    fn check_clusters(&self, namespace: &Namespace) -> CacheResult<()> {
        match namespace
            .placement
            .keys()
            .find(|id| !self.clusters.contains_key(*id))
        {
            Some(cluster) => Err(CacheError::UnknownCluster {
                key: namespace.key.clone(),
                cluster: cluster.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Thread-safe in-process cache.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    inner: Arc<RwLock<CacheState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Clusters ───────────────────────────────────────────────────

    /// Register a cluster, or replace its capacity and labels.
    pub fn add_cluster(&self, cluster: Cluster) {
        debug!(cluster = %cluster.id, "cluster registered");
        self.write().clusters.insert(cluster.id.clone(), cluster);
    }

    /// Deregister a cluster. Returns true if it existed.
    ///
    /// Placements that still reference the cluster are kept; the next
    /// reschedule of those namespaces will fail to honor them.
    pub fn remove_cluster(&self, id: &str) -> bool {
        let existed = self.write().clusters.remove(id).is_some();
        debug!(cluster = %id, existed, "cluster removed");
        existed
    }

    /// All registered clusters, ordered by id.
    pub fn clusters(&self) -> Vec<Cluster> {
        self.read().clusters.values().cloned().collect()
    }

    // ── Listing ────────────────────────────────────────────────────

    /// All cached namespaces, ordered by key.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut out: Vec<Namespace> = self.read().namespaces.values().cloned().collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// All cached pods, ordered by key.
    pub fn pods(&self) -> Vec<Pod> {
        let mut out: Vec<Pod> = self.read().pods.values().cloned().collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }
}

impl SchedulerCache for InMemoryCache {
    fn get_namespace(&self, key: &str) -> Option<Namespace> {
        self.read().namespaces.get(key).cloned()
    }

    fn get_pod(&self, key: &str) -> Option<Pod> {
        self.read().pods.get(key).cloned()
    }

    fn add_namespace(&self, namespace: &Namespace) -> CacheResult<()> {
        let mut state = self.write();
        if state.namespaces.contains_key(&namespace.key) {
            return Err(CacheError::AlreadyExists(namespace.key.clone()));
        }
        state.check_clusters(namespace)?;
        state
            .namespaces
            .insert(namespace.key.clone(), namespace.clone());
        debug!(key = %namespace.key, placement = ?namespace.placement, "namespace added");
        Ok(())
    }

    fn update_namespace(&self, old: &Namespace, new: &Namespace) -> CacheResult<()> {
        if old.key != new.key {
            return Err(CacheError::Stale(new.key.clone()));
        }
        let mut state = self.write();
        match state.namespaces.get(&old.key) {
            None => return Err(CacheError::NotFound(old.key.clone())),
            Some(cached) if cached != old => return Err(CacheError::Stale(old.key.clone())),
            Some(_) => {}
        }
        state.check_clusters(new)?;
        state.namespaces.insert(new.key.clone(), new.clone());
        debug!(key = %new.key, placement = ?new.placement, "namespace updated");
        Ok(())
    }

    /// Pods of the namespace are kept; they still count against its quota
    /// if the namespace is scheduled again.
    fn remove_namespace(&self, namespace: &Namespace) {
        let mut state = self.write();
        let existed = state.namespaces.remove(&namespace.key).is_some();
        let pods_left = state
            .pods
            .values()
            .filter(|pod| pod.namespace_key == namespace.key)
            .count();
        debug!(key = %namespace.key, existed, pods_left, "namespace removed");
    }

    fn add_pod(&self, pod: &Pod) -> CacheResult<()> {
        let mut state = self.write();
        if state.pods.contains_key(&pod.key) {
            return Err(CacheError::AlreadyExists(pod.key.clone()));
        }
        let namespace = state
            .namespaces
            .get(&pod.namespace_key)
            .ok_or_else(|| CacheError::NotFound(pod.namespace_key.clone()))?;
        let cluster = pod
            .cluster
            .as_ref()
            .ok_or_else(|| CacheError::Unassigned(pod.key.clone()))?;
        if !namespace.placement.contains_key(cluster) {
            return Err(CacheError::UnknownCluster {
                key: pod.key.clone(),
                cluster: cluster.clone(),
            });
        }
        debug!(key = %pod.key, %cluster, "pod added");
        state.pods.insert(pod.key.clone(), pod.clone());
        Ok(())
    }

    fn remove_pod(&self, pod: &Pod) {
        let existed = self.write().pods.remove(&pod.key).is_some();
        debug!(key = %pod.key, existed, "pod removed");
    }

    fn snapshot_for_namespace(
        &self,
        current: Option<&Namespace>,
    ) -> CacheResult<NamespaceSnapshot> {
        let state = self.read();
        let mut clusters: BTreeMap<ClusterId, ClusterUsage> = state
            .clusters
            .values()
            .map(|c| {
                (
                    c.id.clone(),
                    ClusterUsage {
                        capacity: c.capacity,
                        allocated: ResourceQuantity::ZERO,
                    },
                )
            })
            .collect();

        let skip = current.map(|ns| ns.key.as_str());
        for ns in state.namespaces.values() {
            if Some(ns.key.as_str()) == skip {
                continue;
            }
            for cluster in ns.placement.keys() {
                if let Some(usage) = clusters.get_mut(cluster) {
                    usage.allocated = usage.allocated.saturating_add(ns.footprint_on(cluster));
                }
            }
        }

        Ok(NamespaceSnapshot { clusters })
    }

    fn snapshot_for_pod(&self, pod: &Pod) -> CacheResult<PodSnapshot> {
        let state = self.read();
        let namespace = state
            .namespaces
            .get(&pod.namespace_key)
            .ok_or_else(|| CacheError::NotFound(pod.namespace_key.clone()))?;

        let mut requested: BTreeMap<ClusterId, ResourceQuantity> = BTreeMap::new();
        for other in state.pods.values() {
            if other.namespace_key != namespace.key || other.key == pod.key {
                continue;
            }
            if let Some(cluster) = &other.cluster {
                let entry = requested.entry(cluster.clone()).or_default();
                *entry = entry.saturating_add(other.request);
            }
        }

        Ok(PodSnapshot {
            namespace_key: namespace.key.clone(),
            quota_slice: namespace.quota_slice,
            placement: namespace.placement.clone(),
            requested,
        })
    }
}
