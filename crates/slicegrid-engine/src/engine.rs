//! Engine: the five scheduling operations behind one exclusive gate.
//!
//! Every public operation holds the gate from its first cache read to its
//! final commit, so snapshot, decision and commit of one call never
//! interleave with another call's. Failed calls leave the cache exactly
//! as they found it.

use std::sync::Arc;

use slicegrid_placement::FitAlgorithm;
use slicegrid_state::{Namespace, PlacementMap, Pod, SchedulerCache};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::partition::{aggregate_placement, partition_slices};

/// The placement-decision engine.
///
/// Holds no scheduling state of its own; namespaces and pods live in the
/// cache, and callers' records are never mutated.
pub struct Engine {
    /// Serializes every operation process-wide.
    gate: Mutex<()>,
    cache: Arc<dyn SchedulerCache>,
    algorithm: Arc<dyn FitAlgorithm>,
}

impl Engine {
    pub fn new(cache: Arc<dyn SchedulerCache>, algorithm: Arc<dyn FitAlgorithm>) -> Self {
        Self {
            gate: Mutex::new(()),
            cache,
            algorithm,
        }
    }

    /// Place (or re-place) a namespace's slices and commit the result.
    ///
    /// A namespace may already be cached: an earlier result may not have
    /// reached the tenant, or the caller is reconciling after placements
    /// were edited by hand. All slices are re-examined against a fresh
    /// snapshot; existing placement is kept wherever it still fits.
    pub async fn schedule_namespace(&self, requested: &Namespace) -> EngineResult<Namespace> {
        let _gate = self.gate.lock().await;

        let key = requested.key.as_str();
        let current = self.cache.get_namespace(key);
        let previous = match &current {
            Some(cur) => {
                if !requested.comparable(cur) {
                    warn!(namespace = %key, "rejected reschedule with quota shape change");
                    return Err(EngineError::ShapeMismatch {
                        key: key.to_string(),
                    });
                }
                cur.placement.clone()
            }
            None => PlacementMap::new(),
        };

        let slices = partition_slices(requested, &previous);
        debug!(namespace = %key, slices = slices.len(), "partitioned namespace quota");

        let snapshot = self.cache.snapshot_for_namespace(current.as_ref())?;
        let decided = self.algorithm.decide_placements(slices, &snapshot);
        let placement = aggregate_placement(&decided)?;

        let scheduled = requested.with_placement(placement);
        match &current {
            Some(cur) => self.cache.update_namespace(cur, &scheduled)?,
            None => self.cache.add_namespace(&scheduled)?,
        }

        info!(
            namespace = %key,
            total_slices = scheduled.total_slices,
            placement = ?scheduled.placement,
            rescheduled = current.is_some(),
            "namespace scheduled"
        );
        Ok(scheduled)
    }

    /// Record an externally decided placement without consulting the fit algorithm.
    pub async fn ensure_namespace_placements(&self, namespace: &Namespace) -> EngineResult<()> {
        let _gate = self.gate.lock().await;

        let key = namespace.key.as_str();
        match self.cache.get_namespace(key) {
            Some(cur) => {
                if !namespace.comparable(&cur) {
                    warn!(namespace = %key, "rejected placement override with quota shape change");
                    return Err(EngineError::ShapeMismatch {
                        key: key.to_string(),
                    });
                }
                self.cache.update_namespace(&cur, namespace)?;
            }
            None => self.cache.add_namespace(namespace)?,
        }

        info!(namespace = %key, placement = ?namespace.placement, "namespace placement ensured");
        Ok(())
    }

    /// Remove a namespace from the cache. Missing namespaces are not an error.
    pub async fn deschedule_namespace(&self, key: &str) -> EngineResult<()> {
        let _gate = self.gate.lock().await;

        match self.cache.get_namespace(key) {
            Some(ns) => {
                self.cache.remove_namespace(&ns);
                info!(namespace = %key, "namespace descheduled");
            }
            None => debug!(namespace = %key, "namespace already removed, deschedule is not needed"),
        }
        Ok(())
    }

    /// Bind a pod to one cluster of its already-scheduled namespace.
    pub async fn schedule_pod(&self, requested: &Pod) -> EngineResult<Pod> {
        let _gate = self.gate.lock().await;

        let ns_key = requested.namespace_key.as_str();
        if self.cache.get_namespace(ns_key).is_none() {
            warn!(
                pod = %requested.key,
                namespace = %ns_key,
                "pod scheduled ahead of its namespace"
            );
            return Err(EngineError::NamespaceNotScheduled(ns_key.to_string()));
        }

        let snapshot = self.cache.snapshot_for_pod(requested)?;
        let cluster = self.algorithm.decide_pod_placement(requested, &snapshot)?;

        let scheduled = requested.with_cluster(cluster);
        self.cache.add_pod(&scheduled)?;

        info!(
            pod = %scheduled.key,
            namespace = %ns_key,
            cluster = scheduled.cluster.as_deref().unwrap_or_default(),
            "pod scheduled"
        );
        Ok(scheduled)
    }

    /// Remove a pod from the cache. Missing pods are not an error.
    pub async fn deschedule_pod(&self, key: &str) -> EngineResult<()> {
        let _gate = self.gate.lock().await;

        match self.cache.get_pod(key) {
            Some(pod) => {
                self.cache.remove_pod(&pod);
                info!(pod = %key, "pod descheduled");
            }
            None => debug!(pod = %key, "pod already removed, deschedule is not needed"),
        }
        Ok(())
    }

    /// The committed record of a namespace, read under the gate.
    pub async fn namespace(&self, key: &str) -> Option<Namespace> {
        let _gate = self.gate.lock().await;
        self.cache.get_namespace(key)
    }

    /// The committed record of a pod, read under the gate.
    pub async fn pod(&self, key: &str) -> Option<Pod> {
        let _gate = self.gate.lock().await;
        self.cache.get_pod(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicegrid_placement::ScoringFit;
    use slicegrid_state::{Cluster, InMemoryCache, ResourceQuantity};

    fn slice() -> ResourceQuantity {
        ResourceQuantity::new(1000, 1024)
    }

    fn test_engine() -> (Engine, InMemoryCache) {
        let cache = InMemoryCache::new();
        cache.add_cluster(Cluster::new("a", slice().scaled(4)));
        cache.add_cluster(Cluster::new("b", slice().scaled(4)));
        let engine = Engine::new(Arc::new(cache.clone()), Arc::new(ScoringFit::default()));
        (engine, cache)
    }

    #[tokio::test]
    async fn first_schedule_adds_namespace() {
        let (engine, cache) = test_engine();
        let requested = Namespace::new("t1/ns", slice(), 6);

        let scheduled = engine.schedule_namespace(&requested).await.unwrap();

        assert_eq!(scheduled.placed_slices(), 6);
        assert!(requested.placement.is_empty());
        assert_eq!(cache.get_namespace("t1/ns"), Some(scheduled));
    }

    #[tokio::test]
    async fn schedule_over_capacity_leaves_cache_untouched() {
        let (engine, cache) = test_engine();
        let requested = Namespace::new("t1/ns", slice(), 9);

        let err = engine.schedule_namespace(&requested).await.unwrap_err();

        assert!(matches!(err, EngineError::Placement(_)));
        assert!(err.is_retryable());
        assert!(cache.get_namespace("t1/ns").is_none());
    }

    #[tokio::test]
    async fn shape_change_is_rejected() {
        let (engine, cache) = test_engine();
        let first = engine
            .schedule_namespace(&Namespace::new("t1/ns", slice(), 2))
            .await
            .unwrap();

        let err = engine
            .schedule_namespace(&Namespace::new("t1/ns", slice(), 3))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::ShapeMismatch {
                key: "t1/ns".to_string()
            }
        );
        assert!(!err.is_retryable());
        assert_eq!(cache.get_namespace("t1/ns"), Some(first));
    }

    #[tokio::test]
    async fn pod_requires_namespace() {
        let (engine, cache) = test_engine();
        let pod = Pod::new("t1/ns/p0", "t1/ns", ResourceQuantity::new(100, 100));

        let err = engine.schedule_pod(&pod).await.unwrap_err();

        assert_eq!(err, EngineError::NamespaceNotScheduled("t1/ns".to_string()));
        assert!(cache.pods().is_empty());
    }

    #[tokio::test]
    async fn pod_lands_on_namespace_cluster() {
        let (engine, _cache) = test_engine();
        let mut ns = Namespace::new("t1/ns", slice(), 1);
        ns.placement.insert("b".to_string(), 1);
        engine.ensure_namespace_placements(&ns).await.unwrap();

        let pod = Pod::new("t1/ns/p0", "t1/ns", ResourceQuantity::new(100, 100));
        let scheduled = engine.schedule_pod(&pod).await.unwrap();

        assert_eq!(scheduled.cluster.as_deref(), Some("b"));
        assert_eq!(pod.cluster, None);
        assert_eq!(engine.pod("t1/ns/p0").await, Some(scheduled));
    }

    #[tokio::test]
    async fn deschedule_missing_is_noop() {
        let (engine, _cache) = test_engine();
        assert!(engine.deschedule_namespace("t1/ns").await.is_ok());
        assert!(engine.deschedule_pod("t1/ns/p0").await.is_ok());
    }

    #[tokio::test]
    async fn namespace_accessor_reads_committed_record() {
        let (engine, _cache) = test_engine();
        assert!(engine.namespace("t1/ns").await.is_none());

        let scheduled = engine
            .schedule_namespace(&Namespace::new("t1/ns", slice(), 1))
            .await
            .unwrap();
        assert_eq!(engine.namespace("t1/ns").await, Some(scheduled));
    }
}
