use serde::Serialize;

use sa_core::GeoPoint;

use crate::rings::Ring;
use crate::weight::circle_area_sqkm;

/// How crowded the entity's own category is at one radius.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompetitionIndex {
    pub center:          GeoPoint,
    pub radius_km:       f64,
    pub category:        String,
    pub count:           usize,
    pub sum_weight:      f64,
    pub total_poi_count: usize,
    pub other_poi_count: usize,
    /// `count / total_poi_count`, 0 when there are no POIs.
    pub share:           f64,
    pub area_sqkm:       f64,
    /// `count / (π r²)`.
    pub per_sqkm:        f64,
}

impl CompetitionIndex {
    pub fn from_ring(center: GeoPoint, ring: &Ring, category: &str) -> Self {
        let count = ring.count(category);
        let total = ring.totals.total_poi_count;
        let area_sqkm = circle_area_sqkm(ring.radius_km);
        Self {
            center,
            radius_km: ring.radius_km,
            category: category.to_owned(),
            count,
            sum_weight: ring.sum_weight(category),
            total_poi_count: total,
            other_poi_count: total.saturating_sub(count),
            share: if total > 0 { count as f64 / total as f64 } else { 0.0 },
            area_sqkm,
            per_sqkm: if area_sqkm > 0.0 { count as f64 / area_sqkm } else { 0.0 },
        }
    }
}
