//! Placement failure reasons.

use thiserror::Error;

/// Why a slice or pod could not be placed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("cluster {cluster} required by {namespace} is not available")]
    ClusterUnavailable { namespace: String, cluster: String },

    #[error("no cluster has capacity for a slice of {namespace}")]
    InsufficientCapacity { namespace: String },

    #[error("no cluster of namespace {namespace} has quota left for pod {pod}")]
    InsufficientQuota { namespace: String, pod: String },
}
