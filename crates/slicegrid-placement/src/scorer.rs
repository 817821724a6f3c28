//! Cluster scoring for slice placement.
//!
//! Evaluates candidate clusters using a weighted combination of:
//! - **Bin-packing** (best-fit): prefer clusters that will be most full after placement
//! - **Balance**: prefer clusters whose utilization is close to the fleet average
//! - **Resource availability**: reject clusters that can't fit the slice

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slicegrid_state::{ClusterId, ClusterUsage, ResourceQuantity};

/// Scored placement result for a single cluster.
#[derive(Debug, Clone)]
pub struct ClusterScore {
    pub cluster_id: ClusterId,
    /// Composite score (higher = better). Range: 0.0..=100.0 for weights summing to 1.
    pub score: f64,
}

/// Weights for the scoring components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub bin_packing: f64,
    pub balance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            bin_packing: 0.6,
            balance: 0.4,
        }
    }
}

/// Score a single cluster for one slice of `size`.
///
/// Returns `None` when the slice does not fit.
pub fn score_cluster(
    cluster_id: &str,
    usage: &ClusterUsage,
    size: &ResourceQuantity,
    weights: &ScoringWeights,
    fleet_avg_utilization: f64,
) -> Option<ClusterScore> {
    let free = usage.free();
    if !size.fits_within(&free) {
        return None;
    }

    // How full the cluster will be once this slice lands.
    let projected = ClusterUsage {
        capacity: usage.capacity,
        allocated: usage.allocated.saturating_add(*size),
    };
    let bin_packing = projected.utilization().min(1.0) * 100.0;

    // Penalize clusters far from the fleet average.
    let balance = (1.0 - (usage.utilization() - fleet_avg_utilization).abs()).max(0.0) * 100.0;

    let score = weights.bin_packing * bin_packing + weights.balance * balance;

    Some(ClusterScore {
        cluster_id: cluster_id.to_string(),
        score,
    })
}

/// Score all clusters and return the ones that fit, best first.
///
/// Equal scores are ordered by cluster id so the ranking is reproducible.
pub fn rank_clusters(
    clusters: &BTreeMap<ClusterId, ClusterUsage>,
    size: &ResourceQuantity,
    weights: &ScoringWeights,
) -> Vec<ClusterScore> {
    let fleet_avg = if clusters.is_empty() {
        0.5
    } else {
        clusters.values().map(ClusterUsage::utilization).sum::<f64>() / clusters.len() as f64
    };

    let mut scores: Vec<ClusterScore> = clusters
        .iter()
        .filter_map(|(id, usage)| score_cluster(id, usage, size, weights, fleet_avg))
        .collect();

    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });
    scores
}
