//! Per-POI distance measurement.
//!
//! ```text
//! all POIs ──haversine ≤ max radius──► survivors
//!     ──tiered snap (centre + batch)──► bounded Dijkstra from centre
//!     ──path + centre offset + POI offset ≤ max radius──► network distance
//! ```
//!
//! A POI without a network distance (unsnapped, unreached, or beyond the
//! bound) keeps `network_km = None`; the distance mode decides what that
//! means for aggregation.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use sa_core::GeoPoint;
use sa_poi::PoiRecord;
use sa_spatial::{PlainNetwork, SnapTiers};

/// Distances of one POI from the query centre.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PoiDistance {
    /// Index into the category's POI slice.
    pub index:        usize,
    pub haversine_km: f64,
    pub network_km:   Option<f64>,
}

/// Measured POIs of one category.
#[derive(Clone, Debug)]
pub struct CategoryDistances {
    pub category:  String,
    pub pois:      Arc<[PoiRecord]>,
    /// Only POIs within the query's largest radius by haversine.
    pub distances: Vec<PoiDistance>,
}

impl CategoryDistances {
    /// POI and distances, in measurement order.
    pub fn iter(&self) -> impl Iterator<Item = (&PoiRecord, &PoiDistance)> + '_ {
        self.distances.iter().map(|d| (&self.pois[d.index], d))
    }
}

/// Network distance in metres from `center` to every point, bounded by
/// `radius_m`.  Output is index-aligned with `points`.
pub fn network_distances_m(
    network: &PlainNetwork,
    center: GeoPoint,
    points: &[GeoPoint],
    radius_m: f64,
    tiers: SnapTiers,
) -> Vec<Option<f64>> {
    let mut out = vec![None; points.len()];
    let Some(origin) = network.snap_tiered(center, tiers) else {
        return out;
    };
    let snaps = network.snap_batch_tiered(points, tiers);
    if snaps.iter().all(Option::is_none) {
        return out;
    }

    let tree = network.shortest_paths_from(origin.node, radius_m);
    for (slot, snap) in out.iter_mut().zip(&snaps) {
        let Some(snap) = snap else { continue };
        let Some(path_m) = tree.distance_to(snap.node) else { continue };
        let total = path_m + origin.offset_m + snap.offset_m;
        if total <= radius_m {
            *slot = Some(total);
        }
    }
    debug!(
        points = points.len(),
        routed = out.iter().filter(|d| d.is_some()).count(),
        center_offset_m = origin.offset_m,
        "network distances"
    );
    out
}

/// Haversine-filter `pois` to `max_radius_km`, then attach network
/// distances when `network` is given.
pub fn measure_category(
    category: &str,
    pois: Arc<[PoiRecord]>,
    center: GeoPoint,
    max_radius_km: f64,
    network: Option<&PlainNetwork>,
    tiers: SnapTiers,
) -> CategoryDistances {
    let mut distances: Vec<PoiDistance> = pois
        .iter()
        .enumerate()
        .filter_map(|(index, poi)| {
            let haversine_km = center.distance_km(poi.pos);
            (haversine_km <= max_radius_km).then_some(PoiDistance { index, haversine_km, network_km: None })
        })
        .collect();

    if let Some(network) = network.filter(|_| !distances.is_empty()) {
        let points: Vec<GeoPoint> = distances.iter().map(|d| pois[d.index].pos).collect();
        let network_m = network_distances_m(network, center, &points, max_radius_km * 1_000.0, tiers);
        for (d, m) in distances.iter_mut().zip(network_m) {
            d.network_km = m.map(|m| m / 1_000.0);
        }
    }

    CategoryDistances { category: category.to_owned(), pois, distances }
}
