//! Multi-radius ring summaries.
//!
//! For every radius `r` and category, the POIs whose chosen distance is
//! `<= r` contribute:
//!
//! | Field             | Value                                   |
//! |-------------------|-----------------------------------------|
//! | `count`           | number of POIs                          |
//! | `sum_weight`      | Σ `decay_weight(d, r, decay_scale)`     |
//! | `avg_distance_km` | mean chosen distance                    |
//! | `min_distance_km` | smallest chosen distance                |
//!
//! Categories with no POI in a ring are omitted from that ring.  Because
//! membership only depends on `d <= r`, counts never decrease as `r` grows.

use std::collections::BTreeMap;

use serde::Serialize;

use sa_core::GeoPoint;

use crate::distance::CategoryDistances;
use crate::mode::DistanceMode;
use crate::weight::decay_weight;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryRing {
    pub count:           usize,
    pub sum_weight:      f64,
    pub avg_distance_km: f64,
    pub min_distance_km: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RingTotals {
    pub total_poi_count: usize,
    pub total_weight:    f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ring {
    pub radius_km:  f64,
    pub categories: BTreeMap<String, CategoryRing>,
    pub totals:     RingTotals,
    /// `<category>_share` → category count / total count.
    pub ratios:     BTreeMap<String, f64>,
}

impl Ring {
    pub fn category(&self, category: &str) -> Option<&CategoryRing> {
        self.categories.get(category)
    }

    pub fn count(&self, category: &str) -> usize {
        self.category(category).map_or(0, |c| c.count)
    }

    pub fn sum_weight(&self, category: &str) -> f64 {
        self.category(category).map_or(0.0, |c| c.sum_weight)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RingSummary {
    pub center:         GeoPoint,
    pub distance_mode:  DistanceMode,
    /// Whether network distances took part in this summary.
    pub network_used:   bool,
    pub decay_scale_km: f64,
    pub rings:          Vec<Ring>,
}

/// Chosen distance of every measured POI of one category.
pub(crate) fn chosen_distances(measured: &CategoryDistances, mode: DistanceMode, network_usable: bool) -> Vec<f64> {
    measured
        .distances
        .iter()
        .map(|d| mode.choose(d.haversine_km, d.network_km, network_usable))
        .collect()
}

/// Build one [`Ring`] per radius (radii already normalised).
pub fn summarize_rings(
    measured: &[CategoryDistances],
    radii_km: &[f64],
    decay_scale_km: f64,
    mode: DistanceMode,
    network_usable: bool,
) -> Vec<Ring> {
    let chosen: Vec<(&str, Vec<f64>)> = measured
        .iter()
        .map(|m| (m.category.as_str(), chosen_distances(m, mode, network_usable)))
        .collect();

    radii_km
        .iter()
        .map(|&r| {
            let mut categories = BTreeMap::new();
            let mut totals = RingTotals::default();

            for (category, distances) in &chosen {
                let inside: Vec<f64> = distances.iter().copied().filter(|d| *d <= r).collect();
                if inside.is_empty() {
                    continue;
                }
                let count = inside.len();
                let sum_weight: f64 = inside.iter().map(|d| decay_weight(*d, r, decay_scale_km)).sum();
                let avg_distance_km = inside.iter().sum::<f64>() / count as f64;
                let min_distance_km = inside.iter().copied().fold(f64::INFINITY, f64::min);

                totals.total_poi_count += count;
                totals.total_weight += sum_weight;
                categories.insert(
                    (*category).to_owned(),
                    CategoryRing { count, sum_weight, avg_distance_km, min_distance_km },
                );
            }

            let ratios = if totals.total_poi_count > 0 {
                categories
                    .iter()
                    .map(|(c, v)| (format!("{c}_share"), v.count as f64 / totals.total_poi_count as f64))
                    .collect()
            } else {
                BTreeMap::new()
            };

            Ring { radius_km: r, categories, totals, ratios }
        })
        .collect()
}
