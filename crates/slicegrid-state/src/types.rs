//! Domain types for the scheduler cache.
//!
//! A namespace owns a quota expressed as `total_slices` units of
//! `quota_slice` each; its placement records how many of those units
//! live on each cluster. Records are treated as immutable values: an
//! update produces a fresh copy and never edits the caller's object.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Unique identifier for a physical cluster.
pub type ClusterId = String;

/// Cluster id → number of slices placed there.
///
/// A `BTreeMap` so that every walk over a placement visits clusters in
/// identifier order.
pub type PlacementMap = BTreeMap<ClusterId, u32>;

// ── Resources ─────────────────────────────────────────────────────

/// A bundle of schedulable resources.
///
/// Used for the size of one quota slice, for cluster capacity and for
/// pod requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceQuantity {
    /// CPU in millicores.
    pub cpu_millis: u64,
    /// Memory in bytes.
    pub memory_bytes: u64,
}

impl ResourceQuantity {
    pub const ZERO: Self = Self {
        cpu_millis: 0,
        memory_bytes: 0,
    };

    pub fn new(cpu_millis: u64, memory_bytes: u64) -> Self {
        Self {
            cpu_millis,
            memory_bytes,
        }
    }

    /// This quantity multiplied by `n`, saturating at `u64::MAX`.
    pub fn scaled(self, n: u32) -> Self {
        Self {
            cpu_millis: self.cpu_millis.saturating_mul(u64::from(n)),
            memory_bytes: self.memory_bytes.saturating_mul(u64::from(n)),
        }
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            cpu_millis: self.cpu_millis.saturating_add(other.cpu_millis),
            memory_bytes: self.memory_bytes.saturating_add(other.memory_bytes),
        }
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self {
            cpu_millis: self.cpu_millis.saturating_sub(other.cpu_millis),
            memory_bytes: self.memory_bytes.saturating_sub(other.memory_bytes),
        }
    }

    /// True if every dimension of `self` is at most the same dimension of `available`.
    pub fn fits_within(&self, available: &Self) -> bool {
        self.cpu_millis <= available.cpu_millis && self.memory_bytes <= available.memory_bytes
    }
}

// ── Cluster ───────────────────────────────────────────────────────

/// A physical cluster that namespaces can be placed onto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Total schedulable resources.
    pub capacity: ResourceQuantity,
    /// Arbitrary labels, carried for operators; not used for fit.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Cluster {
    pub fn new(id: impl Into<ClusterId>, capacity: ResourceQuantity) -> Self {
        Self {
            id: id.into(),
            capacity,
            labels: HashMap::new(),
        }
    }
}

// ── Namespace ─────────────────────────────────────────────────────

/// A tenant namespace whose quota is split into equally sized slices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Namespace {
    /// Unique key, usually `{tenant}/{namespace}`.
    pub key: String,
    /// Size of one slice. Fixed for the namespace's lifetime.
    pub quota_slice: ResourceQuantity,
    /// Number of slices currently requested.
    pub total_slices: u32,
    /// Where the slices live.
    #[serde(default)]
    pub placement: PlacementMap,
}

impl Namespace {
    pub fn new(key: impl Into<String>, quota_slice: ResourceQuantity, total_slices: u32) -> Self {
        Self {
            key: key.into(),
            quota_slice,
            total_slices,
            placement: PlacementMap::new(),
        }
    }

    /// Two records are comparable when they agree on key and quota shape.
    /// Placement may differ.
    pub fn comparable(&self, other: &Namespace) -> bool {
        self.key == other.key
            && self.quota_slice == other.quota_slice
            && self.total_slices == other.total_slices
    }

    /// Sum of the slice counts in the placement.
    pub fn placed_slices(&self) -> u32 {
        self.placement.values().sum()
    }

    /// Resources this namespace holds on `cluster`.
    pub fn footprint_on(&self, cluster: &str) -> ResourceQuantity {
        let count = self.placement.get(cluster).copied().unwrap_or(0);
        self.quota_slice.scaled(count)
    }

    /// A copy of this namespace with its placement replaced.
    pub fn with_placement(&self, placement: PlacementMap) -> Namespace {
        Namespace {
            placement,
            ..self.clone()
        }
    }
}

// ── Pod ───────────────────────────────────────────────────────────

/// A workload unit that runs on exactly one cluster of its namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pod {
    pub key: String,
    /// Key of the owning namespace.
    pub namespace_key: String,
    /// Resources the pod asks for.
    #[serde(default)]
    pub request: ResourceQuantity,
    /// Assigned cluster, set once scheduled.
    #[serde(default)]
    pub cluster: Option<ClusterId>,
}

impl Pod {
    pub fn new(
        key: impl Into<String>,
        namespace_key: impl Into<String>,
        request: ResourceQuantity,
    ) -> Self {
        Self {
            key: key.into(),
            namespace_key: namespace_key.into(),
            request,
            cluster: None,
        }
    }

    /// A copy of this pod bound to `cluster`.
    pub fn with_cluster(&self, cluster: impl Into<ClusterId>) -> Pod {
        Pod {
            cluster: Some(cluster.into()),
            ..self.clone()
        }
    }
}
