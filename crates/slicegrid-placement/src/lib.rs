//! SliceGrid fit algorithm: decides which cluster each slice or pod lands on.
//!
//! This crate does NOT read or write the cache (that's `slicegrid-engine`).
//! It takes the slices the engine wants placed plus a snapshot of cluster
//! usage, and annotates each slice with a cluster or a failure reason.
//!
//! # Components
//!
//! - **`slice`**: the schedulable unit and its classification
//! - **`scorer`**: cluster scoring (bin-packing, balance)
//! - **`fit`**: the `FitAlgorithm` seam and the default `ScoringFit`

pub mod error;
pub mod fit;
pub mod scorer;
pub mod slice;

pub use error::PlacementError;
pub use fit::{FitAlgorithm, ScoringFit};
pub use scorer::{ClusterScore, ScoringWeights, rank_clusters, score_cluster};
pub use slice::{Slice, SliceClass};
