//! Slice partitioning and placement aggregation.
//!
//! Partitioning turns a namespace's quota into the slices handed to the
//! fit algorithm; aggregation folds the decided slices back into a
//! placement map. Both are pure functions.

use slicegrid_placement::{Slice, SliceClass};
use slicegrid_state::{Namespace, PlacementMap};

use crate::error::{EngineError, EngineResult};

/// Split `namespace` into `total_slices` classified slices.
///
/// Three passes, in this order:
/// 1. **Mandatory**: the namespace's own placement. Each cluster keeps
///    `min(count, remaining)` slices. The same amount is deducted from that
///    cluster's entry in `previous` so it is not credited twice.
/// 2. **Hinted**: whatever is left of `previous`.
/// 3. **Free**: the remainder.
///
/// When the quota shrank, the mandatory pass stops early and the surplus
/// placement is dropped. Clusters are visited in id order in both passes.
///
/// One `Slice` is materialized per unit, so memory grows linearly with
/// `total_slices`.
pub fn partition_slices(namespace: &Namespace, previous: &PlacementMap) -> Vec<Slice> {
    let mut hints = previous.clone();
    let mut remaining = namespace.total_slices;
    let mut slices = Vec::new();

    for (cluster, &count) in &namespace.placement {
        if remaining == 0 {
            break;
        }
        let mandatory = count.min(remaining);
        if let Some(hinted) = hints.get_mut(cluster) {
            *hinted -= (*hinted).min(mandatory);
        }
        repeat(&mut slices, namespace, SliceClass::Mandatory(cluster.clone()), mandatory);
        remaining -= mandatory;
    }

    for (cluster, &count) in &hints {
        if remaining == 0 {
            break;
        }
        let hinted = count.min(remaining);
        repeat(&mut slices, namespace, SliceClass::Hinted(cluster.clone()), hinted);
        remaining -= hinted;
    }

    repeat(&mut slices, namespace, SliceClass::Free, remaining);
    slices
}

fn repeat(slices: &mut Vec<Slice>, namespace: &Namespace, class: SliceClass, n: u32) {
    for _ in 0..n {
        slices.push(Slice::new(
            namespace.key.clone(),
            namespace.quota_slice,
            class.clone(),
        ));
    }
}

/// Fold decided slices into a cluster → count map.
///
/// Fails on the first slice carrying an error, returning no partial map.
/// A slice with neither result nor error is an internal-consistency
/// failure of the fit algorithm.
pub fn aggregate_placement(slices: &[Slice]) -> EngineResult<PlacementMap> {
    let mut placement = PlacementMap::new();
    for slice in slices {
        if let Some(err) = &slice.error {
            return Err(EngineError::Placement(err.clone()));
        }
        let Some(cluster) = &slice.result else {
            return Err(EngineError::UndecidedSlice {
                namespace: slice.namespace_key.clone(),
            });
        };
        *placement.entry(cluster.clone()).or_insert(0) += 1;
    }
    Ok(placement)
}
