//! Snapping arbitrary coordinates onto network nodes.
//!
//! A snap finds the nearest node (planar lat/lon metric, via the spatial
//! index), measures the exact haversine offset to it, and accepts it only if
//! the offset is within the tolerance.  Because the candidate node does not
//! depend on the tolerance, a point that snaps at `t1` snaps to the same node
//! at every `t2 > t1`.
//!
//! # Tiered fallback
//!
//! [`SnapTiers`] escalates primary → secondary → unbounded.  Batch tiering
//! only retries the entries that are still unsnapped, so a successful snap
//! from a tighter tier is never overwritten.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use sa_core::{GeoPoint, NodeId};

use crate::network::RoadNetwork;
use crate::tags::EdgeTag;

/// Tolerance that accepts any nearest node.
pub const UNBOUNDED_TOLERANCE_M: f64 = f64::INFINITY;

/// Below this many points a batch is snapped on the calling thread.
const PARALLEL_BATCH_MIN: usize = 256;

/// A successful snap: the node and the haversine offset to it in metres.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Snap {
    pub node: NodeId,
    pub offset_m: f64,
}

/// Primary and secondary snap tolerances in metres.  The third, implicit
/// tier is [`UNBOUNDED_TOLERANCE_M`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapTiers {
    pub primary_m: f64,
    pub secondary_m: f64,
}

impl Default for SnapTiers {
    fn default() -> Self {
        Self { primary_m: 120.0, secondary_m: 300.0 }
    }
}

impl SnapTiers {
    pub fn new(primary_m: f64, secondary_m: f64) -> Self {
        Self { primary_m, secondary_m }
    }

    /// Tolerances in the order they are tried.
    pub fn tolerances(&self) -> [f64; 3] {
        [self.primary_m, self.secondary_m, UNBOUNDED_TOLERANCE_M]
    }
}

impl<T: EdgeTag> RoadNetwork<T> {
    /// Snap `pos` to its nearest node if the offset is `<= tolerance_m`.
    ///
    /// A negative or NaN tolerance never matches.  Pass
    /// [`UNBOUNDED_TOLERANCE_M`] to accept any nearest node.
    pub fn snap(&self, pos: GeoPoint, tolerance_m: f64) -> Option<Snap> {
        let node = self.nearest_node(pos)?;
        let offset_m = pos.distance_m(self.node_pos[node.index()]);
        (offset_m.is_finite() && offset_m <= tolerance_m).then_some(Snap { node, offset_m })
    }

    /// Snap many points against one index.  Output is index-aligned with
    /// `points`; each entry follows the [`snap`](Self::snap) contract.
    pub fn snap_batch(&self, points: &[GeoPoint], tolerance_m: f64) -> Vec<Option<Snap>> {
        if points.len() < PARALLEL_BATCH_MIN {
            points.iter().map(|p| self.snap(*p, tolerance_m)).collect()
        } else {
            points.par_iter().map(|p| self.snap(*p, tolerance_m)).collect()
        }
    }

    /// Try each tier in turn until one succeeds.
    pub fn snap_tiered(&self, pos: GeoPoint, tiers: SnapTiers) -> Option<Snap> {
        tiers
            .tolerances()
            .into_iter()
            .find_map(|tol| self.snap(pos, tol))
    }

    /// Batch version of [`snap_tiered`](Self::snap_tiered).  Each tier only
    /// re-snaps the entries the previous tiers left empty.
    pub fn snap_batch_tiered(&self, points: &[GeoPoint], tiers: SnapTiers) -> Vec<Option<Snap>> {
        let [primary, rest @ ..] = tiers.tolerances();
        let mut out = self.snap_batch(points, primary);

        for tol in rest {
            let pending: Vec<usize> = (0..out.len()).filter(|&i| out[i].is_none()).collect();
            if pending.is_empty() {
                break;
            }
            let retry_points: Vec<GeoPoint> = pending.iter().map(|&i| points[i]).collect();
            let retried = self.snap_batch(&retry_points, tol);
            for (i, snap) in pending.into_iter().zip(retried) {
                if snap.is_some() {
                    out[i] = snap;
                }
            }
        }
        out
    }
}
