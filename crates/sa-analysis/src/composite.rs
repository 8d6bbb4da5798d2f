//! Composite index and the flat feature payload handed to the scoring model.
//!
//! Feature keys for a ring of radius `r` (formatted without trailing zeros,
//! so 1.0 → `1km`, 0.5 → `0.5km`):
//!
//! | Key                        | Value                                             |
//! |----------------------------|---------------------------------------------------|
//! | `<cat>_count_<r>km`        | ring count, every configured category             |
//! | `<cat>_weight_<r>km`       | ring weight sum, every configured category        |
//! | `total_poi_count_<r>km`    | Σ count over the other categories                 |
//! | `<cat>_ratio`              | count / that total, other categories              |
//! | `weighted_poi_strength`    | Σ weight sum over the other categories            |
//! | `poi_composite_score`      | Σ category weight · weight sum, other categories  |
//!
//! "Other categories" are all configured categories except the entity's own.

use std::collections::BTreeMap;

use serde::Serialize;

use sa_core::GeoPoint;

use crate::competition::CompetitionIndex;
use crate::report::RoadAccessibilityReport;
use crate::rings::Ring;

/// `1.0` → `"1"`, `0.25` → `"0.25"`.
pub fn radius_label(radius_km: f64) -> String {
    format!("{radius_km}")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompositeIndex {
    pub center:                GeoPoint,
    pub radius_km:             f64,
    pub own_category:          String,
    pub total_poi_count:       usize,
    pub ratios:                BTreeMap<String, f64>,
    pub weighted_poi_strength: f64,
    pub poi_composite_score:   f64,
    pub features:              BTreeMap<String, f64>,
}

impl CompositeIndex {
    /// `category_weight` supplies each other category's importance.
    pub fn from_ring<'a, F>(
        center: GeoPoint,
        ring: &Ring,
        categories: impl IntoIterator<Item = &'a str>,
        own_category: &str,
        category_weight: F,
    ) -> Self
    where
        F: Fn(&str) -> f64,
    {
        let label = radius_label(ring.radius_km);
        let mut features = BTreeMap::new();
        let mut others: Vec<(&str, usize, f64)> = Vec::new();

        for category in categories {
            let count = ring.count(category);
            let weight = ring.sum_weight(category);
            features.insert(format!("{category}_count_{label}km"), count as f64);
            features.insert(format!("{category}_weight_{label}km"), weight);
            if category != own_category {
                others.push((category, count, weight));
            }
        }

        let total_poi_count: usize = others.iter().map(|(_, c, _)| c).sum();
        let ratios: BTreeMap<String, f64> = others
            .iter()
            .map(|(cat, count, _)| {
                let ratio = if total_poi_count > 0 { *count as f64 / total_poi_count as f64 } else { 0.0 };
                (format!("{cat}_ratio"), ratio)
            })
            .collect();
        let weighted_poi_strength: f64 = others.iter().map(|(_, _, w)| w).sum();
        let poi_composite_score: f64 = others.iter().map(|(cat, _, w)| category_weight(*cat) * *w).sum();

        features.insert(format!("total_poi_count_{label}km"), total_poi_count as f64);
        features.extend(ratios.iter().map(|(k, v)| (k.clone(), *v)));
        features.insert("weighted_poi_strength".to_owned(), weighted_poi_strength);
        features.insert("poi_composite_score".to_owned(), poi_composite_score);

        Self {
            center,
            radius_km: ring.radius_km,
            own_category: own_category.to_owned(),
            total_poi_count,
            ratios,
            weighted_poi_strength,
            poi_composite_score,
            features,
        }
    }
}

/// Everything the downstream scoring layer consumes for one location.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeaturePayload {
    pub composite:          CompositeIndex,
    pub competition:        CompetitionIndex,
    pub road_accessibility: Option<RoadAccessibilityReport>,
}

impl FeaturePayload {
    /// Composite features plus `lat`/`lng`, the competition figures and the
    /// road accessibility score when present.
    pub fn flat_features(&self) -> BTreeMap<String, f64> {
        let mut out = self.composite.features.clone();
        out.insert("lat".to_owned(), self.composite.center.lat);
        out.insert("lng".to_owned(), self.composite.center.lon);
        out.insert(format!("{}_share", self.competition.category), self.competition.share);
        out.insert(format!("{}_per_sqkm", self.competition.category), self.competition.per_sqkm);
        if let Some(road) = &self.road_accessibility {
            out.insert("road_accessibility_score".to_owned(), road.result.score);
            out.insert("road_total_decayed_weight".to_owned(), road.result.total_decayed_weight);
        }
        out
    }
}
