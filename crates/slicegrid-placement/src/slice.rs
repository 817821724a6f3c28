//! The schedulable unit.
//!
//! A namespace with `total_slices = n` is scheduled as `n` slices. Each
//! slice is classified before it reaches the fit algorithm: it may be
//! pinned to the cluster that already holds it, hinted toward a cluster
//! that held it before, or free.

use serde::{Deserialize, Serialize};
use slicegrid_state::{ClusterId, ResourceQuantity};

use crate::error::PlacementError;

/// How a slice is constrained going into placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cluster", rename_all = "snake_case")]
pub enum SliceClass {
    /// Must land on this cluster.
    Mandatory(ClusterId),
    /// Should land on this cluster if it still fits.
    Hinted(ClusterId),
    /// No preference.
    Free,
}

/// One quota unit of a namespace, alive for a single scheduling call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub namespace_key: String,
    pub size: ResourceQuantity,
    pub class: SliceClass,
    /// Cluster chosen by the fit algorithm.
    pub result: Option<ClusterId>,
    /// Failure reason set by the fit algorithm.
    pub error: Option<PlacementError>,
}

impl Slice {
    pub fn new(
        namespace_key: impl Into<String>,
        size: ResourceQuantity,
        class: SliceClass,
    ) -> Self {
        Self {
            namespace_key: namespace_key.into(),
            size,
            class,
            result: None,
            error: None,
        }
    }

    pub fn mandatory_cluster(&self) -> Option<&str> {
        match &self.class {
            SliceClass::Mandatory(c) => Some(c.as_str()),
            _ => None,
        }
    }

    pub fn hint_cluster(&self) -> Option<&str> {
        match &self.class {
            SliceClass::Hinted(c) => Some(c.as_str()),
            _ => None,
        }
    }

    pub(crate) fn place(&mut self, cluster: impl Into<ClusterId>) {
        self.result = Some(cluster.into());
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: PlacementError) {
        self.result = None;
        self.error = Some(error);
    }
}
