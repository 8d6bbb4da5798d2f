//! Ranked nearby-POI listing.

use serde::Serialize;

use crate::distance::CategoryDistances;
use crate::mode::DistanceMode;
use crate::weight::decay_weight;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NearbyPoi {
    pub name:                Option<String>,
    pub lat:                 f64,
    pub lon:                 f64,
    pub subcategory:         Option<String>,
    pub distance_km:         f64,
    /// Present whenever the network was usable; haversine when the POI had
    /// no route (see `network_routed`).
    pub network_distance_km: Option<f64>,
    pub network_routed:      bool,
    pub chosen_distance_km:  f64,
    pub weight:              f64,
    /// The dataset's own importance column, passed through untouched.
    pub importance:          Option<f64>,
}

/// POIs of one category within `radius_km`, nearest first by chosen
/// distance, at most `max(limit, 1)` entries.
pub fn nearby_list(
    measured: &CategoryDistances,
    radius_km: f64,
    decay_scale_km: f64,
    mode: DistanceMode,
    network_usable: bool,
    limit: usize,
) -> Vec<NearbyPoi> {
    let mut items: Vec<NearbyPoi> = measured
        .iter()
        .filter(|(_, d)| d.haversine_km <= radius_km)
        .map(|(poi, d)| {
            let chosen = mode.choose(d.haversine_km, d.network_km, network_usable);
            NearbyPoi {
                name:                poi.name.clone(),
                lat:                 poi.pos.lat,
                lon:                 poi.pos.lon,
                subcategory:         poi.subcategory.clone(),
                distance_km:         d.haversine_km,
                network_distance_km: network_usable.then(|| d.network_km.unwrap_or(d.haversine_km)),
                network_routed:      d.network_km.is_some(),
                chosen_distance_km:  chosen,
                weight:              decay_weight(chosen, radius_km, decay_scale_km),
                importance:          poi.weight,
            }
        })
        .collect();

    items.sort_by(|a, b| a.chosen_distance_km.total_cmp(&b.chosen_distance_km));
    items.truncate(limit.max(1));
    items
}
