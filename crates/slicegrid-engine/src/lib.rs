//! slicegrid-engine: the placement-decision core.
//!
//! Reconciles namespace quota requests against committed placement and
//! binds pods to clusters of their namespace. The engine:
//!
//! - Splits a namespace's quota into mandatory, hinted and free slices
//! - Delegates cluster choice to a `FitAlgorithm` over a cache snapshot
//! - Commits the result to the `SchedulerCache` all-or-nothing
//! - Deschedules namespaces and pods idempotently
//!
//! # Architecture
//!
//! ```text
//! Engine (one exclusive gate around every operation)
//!   ├── partition_slices / aggregate_placement
//!   ├── SchedulerCache (lookup, snapshot, commit)
//!   └── FitAlgorithm (decide slices / pod)
//! ```

pub mod engine;
pub mod error;
pub mod partition;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use partition::{aggregate_placement, partition_slices};
