//! Point-in-time views handed to the fit algorithm.
//!
//! Snapshots are plain owned values: once produced they no longer track
//! the cache, so a decision made against one is made against a single
//! consistent picture.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ClusterId, PlacementMap, ResourceQuantity};

/// Capacity and current allocation of one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterUsage {
    pub capacity: ResourceQuantity,
    pub allocated: ResourceQuantity,
}

impl ClusterUsage {
    pub fn free(&self) -> ResourceQuantity {
        self.capacity.saturating_sub(self.allocated)
    }

    /// Fraction of memory in use, falling back to CPU when the cluster
    /// declares no memory.
    pub fn utilization(&self) -> f64 {
        if self.capacity.memory_bytes > 0 {
            self.allocated.memory_bytes as f64 / self.capacity.memory_bytes as f64
        } else if self.capacity.cpu_millis > 0 {
            self.allocated.cpu_millis as f64 / self.capacity.cpu_millis as f64
        } else {
            1.0
        }
    }
}

/// Global cluster usage for placing a namespace's slices.
///
/// The namespace being scheduled is excluded from `allocated`, so its own
/// prior footprint is available to it again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    pub clusters: BTreeMap<ClusterId, ClusterUsage>,
}

/// Namespace-scoped view for placing a single pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub namespace_key: String,
    pub quota_slice: ResourceQuantity,
    /// The owning namespace's committed placement.
    pub placement: PlacementMap,
    /// Resources already requested by the namespace's pods, per cluster.
    pub requested: BTreeMap<ClusterId, ResourceQuantity>,
}

impl PodSnapshot {
    /// Namespace quota still unused by pods on `cluster`.
    pub fn remaining_on(&self, cluster: &str) -> ResourceQuantity {
        let count = self.placement.get(cluster).copied().unwrap_or(0);
        let quota = self.quota_slice.scaled(count);
        let used = self.requested.get(cluster).copied().unwrap_or_default();
        quota.saturating_sub(used)
    }
}
