//! slicegrid-state: the scheduler cache for SliceGrid.
//!
//! Holds the durable records the placement engine reasons about:
//! namespaces (a quota split into slices and spread over clusters),
//! pods (one workload bound to one cluster), and the clusters themselves.
//!
//! # Architecture
//!
//! The engine talks to the cache through the [`SchedulerCache`] trait.
//! [`InMemoryCache`] is the process-local implementation; it produces
//! point-in-time snapshots so placement decisions are made against a
//! consistent picture of cluster usage.

pub mod cache;
pub mod error;
pub mod snapshot;
pub mod types;

pub use cache::{InMemoryCache, SchedulerCache};
pub use error::{CacheError, CacheResult};
pub use snapshot::{ClusterUsage, NamespaceSnapshot, PodSnapshot};
pub use types::*;
