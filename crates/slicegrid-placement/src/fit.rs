//! Fit algorithm: turns classified slices into cluster assignments.
//!
//! The engine hands over every slice of a namespace together with a
//! snapshot of cluster usage. [`ScoringFit`] walks the slices in the order
//! given (mandatory, then hinted, then free), consuming capacity on a
//! private copy of the snapshot as it goes, so later slices see the effect
//! of earlier ones.

use std::collections::BTreeMap;

use slicegrid_state::{ClusterId, ClusterUsage, NamespaceSnapshot, Pod, PodSnapshot};
use tracing::{debug, warn};

use crate::error::PlacementError;
use crate::scorer::{ScoringWeights, rank_clusters};
use crate::slice::{Slice, SliceClass};

/// Chooses clusters for slices and pods against a snapshot.
///
/// Implementations must be pure with respect to the snapshot: no side
/// effects beyond the returned annotations.
pub trait FitAlgorithm: Send + Sync {
    /// Annotate every slice with a `result` or an `error`.
    fn decide_placements(&self, slices: Vec<Slice>, snapshot: &NamespaceSnapshot) -> Vec<Slice>;

    /// Pick the cluster a pod runs on.
    fn decide_pod_placement(
        &self,
        pod: &Pod,
        snapshot: &PodSnapshot,
    ) -> Result<ClusterId, PlacementError>;
}

/// Default fit algorithm: honors mandatory and hinted clusters, scores
/// the rest.
#[derive(Debug, Clone, Default)]
pub struct ScoringFit {
    weights: ScoringWeights,
}

impl ScoringFit {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    fn place_free(&self, slice: &mut Slice, working: &mut BTreeMap<ClusterId, ClusterUsage>) {
        let ranked = rank_clusters(working, &slice.size, &self.weights);
        let Some(best) = ranked.first() else {
            warn!(namespace = %slice.namespace_key, "no cluster can fit slice");
            slice.fail(PlacementError::InsufficientCapacity {
                namespace: slice.namespace_key.clone(),
            });
            return;
        };
        if let Some(usage) = working.get_mut(&best.cluster_id) {
            usage.allocated = usage.allocated.saturating_add(slice.size);
        }
        debug!(
            namespace = %slice.namespace_key,
            cluster = %best.cluster_id,
            score = best.score,
            "placed free slice"
        );
        slice.place(best.cluster_id.clone());
    }
}

impl FitAlgorithm for ScoringFit {
    fn decide_placements(
        &self,
        mut slices: Vec<Slice>,
        snapshot: &NamespaceSnapshot,
    ) -> Vec<Slice> {
        let mut working = snapshot.clusters.clone();

        for slice in &mut slices {
            match slice.class.clone() {
                SliceClass::Mandatory(cluster) => match working.get_mut(&cluster) {
                    // The cluster already holds this slice; it is not re-checked for fit.
                    Some(usage) => {
                        usage.allocated = usage.allocated.saturating_add(slice.size);
                        slice.place(cluster);
                    }
                    None => {
                        warn!(
                            namespace = %slice.namespace_key,
                            %cluster,
                            "mandatory cluster missing"
                        );
                        slice.fail(PlacementError::ClusterUnavailable {
                            namespace: slice.namespace_key.clone(),
                            cluster,
                        });
                    }
                },
                SliceClass::Hinted(cluster) => {
                    let fits = working
                        .get(&cluster)
                        .is_some_and(|usage| slice.size.fits_within(&usage.free()));
                    if fits {
                        if let Some(usage) = working.get_mut(&cluster) {
                            usage.allocated = usage.allocated.saturating_add(slice.size);
                        }
                        slice.place(cluster);
                    } else {
                        debug!(
                            namespace = %slice.namespace_key,
                            %cluster,
                            "hint no longer fits, placing freely"
                        );
                        self.place_free(slice, &mut working);
                    }
                }
                SliceClass::Free => self.place_free(slice, &mut working),
            }
        }

        slices
    }

    fn decide_pod_placement(
        &self,
        pod: &Pod,
        snapshot: &PodSnapshot,
    ) -> Result<ClusterId, PlacementError> {
        let best = snapshot
            .placement
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(cluster, _)| (cluster, snapshot.remaining_on(cluster)))
            .filter(|(_, remaining)| pod.request.fits_within(remaining))
            .max_by(|(a_id, a), (b_id, b)| {
                a.memory_bytes
                    .cmp(&b.memory_bytes)
                    .then(a.cpu_millis.cmp(&b.cpu_millis))
                    .then_with(|| b_id.cmp(a_id))
            });

        match best {
            Some((cluster, remaining)) => {
                debug!(pod = %pod.key, %cluster, ?remaining, "pod placed");
                Ok(cluster.clone())
            }
            None => {
                warn!(pod = %pod.key, namespace = %snapshot.namespace_key, "no quota left for pod");
                Err(PlacementError::InsufficientQuota {
                    namespace: snapshot.namespace_key.clone(),
                    pod: pod.key.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicegrid_state::{PlacementMap, ResourceQuantity};

    fn unit() -> ResourceQuantity {
        ResourceQuantity::new(1000, 1000)
    }

    fn snapshot(clusters: &[(&str, u32)]) -> NamespaceSnapshot {
        NamespaceSnapshot {
            clusters: clusters
                .iter()
                .map(|(id, units)| {
                    (
                        id.to_string(),
                        ClusterUsage {
                            capacity: unit().scaled(*units),
                            allocated: ResourceQuantity::ZERO,
                        },
                    )
                })
                .collect(),
        }
    }

    fn slices(class: SliceClass, n: usize) -> Vec<Slice> {
        (0..n).map(|_| Slice::new("t1/ns", unit(), class.clone())).collect()
    }

    #[test]
    fn mandatory_lands_on_its_cluster() {
        let fit = ScoringFit::default();
        let out = fit.decide_placements(
            slices(SliceClass::Mandatory("a".into()), 2),
            &snapshot(&[("a", 1), ("b", 10)]),
        );
        assert!(out.iter().all(|s| s.result.as_deref() == Some("a")));
    }

    #[test]
    fn mandatory_on_missing_cluster_fails() {
        let fit = ScoringFit::default();
        let out = fit.decide_placements(
            slices(SliceClass::Mandatory("gone".into()), 1),
            &snapshot(&[("a", 4)]),
        );
        assert!(matches!(
            out[0].error,
            Some(PlacementError::ClusterUnavailable { ref cluster, .. }) if cluster == "gone"
        ));
        assert!(out[0].result.is_none());
    }

    #[test]
    fn hint_honored_while_it_fits() {
        let fit = ScoringFit::default();
        let out = fit.decide_placements(
            slices(SliceClass::Hinted("a".into()), 3),
            &snapshot(&[("a", 2), ("b", 10)]),
        );
        let on_a = out.iter().filter(|s| s.result.as_deref() == Some("a")).count();
        let on_b = out.iter().filter(|s| s.result.as_deref() == Some("b")).count();
        assert_eq!(on_a, 2);
        assert_eq!(on_b, 1);
    }

    #[test]
    fn free_slices_fail_when_fleet_is_full() {
        let fit = ScoringFit::default();
        let out = fit.decide_placements(
            slices(SliceClass::Free, 3),
            &snapshot(&[("a", 1), ("b", 1)]),
        );

        let placed = out.iter().filter(|s| s.result.is_some()).count();
        assert_eq!(placed, 2);
        assert!(matches!(
            out[2].error,
            Some(PlacementError::InsufficientCapacity { .. })
        ));
    }

    #[test]
    fn snapshot_is_not_mutated() {
        let fit = ScoringFit::default();
        let snap = snapshot(&[("a", 4)]);
        let before = snap.clone();
        fit.decide_placements(slices(SliceClass::Free, 2), &snap);
        assert_eq!(snap, before);
    }

    fn pod_snapshot(placement: &[(&str, u32)], requested: &[(&str, u64)]) -> PodSnapshot {
        PodSnapshot {
            namespace_key: "t1/ns".to_string(),
            quota_slice: unit(),
            placement: placement.iter().map(|(c, n)| (c.to_string(), *n)).collect::<PlacementMap>(),
            requested: requested
                .iter()
                .map(|(c, units)| (c.to_string(), unit().scaled(*units as u32)))
                .collect(),
        }
    }

    #[test]
    fn pod_goes_to_cluster_with_most_quota_left() {
        let fit = ScoringFit::default();
        let pod = Pod::new("t1/ns/p", "t1/ns", unit());
        let snap = pod_snapshot(&[("a", 3), ("b", 3)], &[("a", 2)]);
        assert_eq!(fit.decide_pod_placement(&pod, &snap).unwrap(), "b");
    }

    #[test]
    fn pod_tie_picks_lowest_cluster_id() {
        let fit = ScoringFit::default();
        let pod = Pod::new("t1/ns/p", "t1/ns", unit());
        let snap = pod_snapshot(&[("b", 2), ("a", 2)], &[]);
        assert_eq!(fit.decide_pod_placement(&pod, &snap).unwrap(), "a");
    }

    #[test]
    fn pod_without_quota_fails() {
        let fit = ScoringFit::default();
        let pod = Pod::new("t1/ns/p", "t1/ns", unit().scaled(2));
        let snap = pod_snapshot(&[("a", 1), ("b", 0)], &[]);
        let err = fit.decide_pod_placement(&pod, &snap).unwrap_err();
        assert_eq!(
            err,
            PlacementError::InsufficientQuota {
                namespace: "t1/ns".to_string(),
                pod: "t1/ns/p".to_string(),
            }
        );
    }
}
