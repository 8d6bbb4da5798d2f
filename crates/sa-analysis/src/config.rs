//! Engine configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "data_root": "/srv/sitex", "radii_km": [0.5, 1.0, 2.0], "own_category": "cafes" }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sa_core::GeoPoint;
use sa_poi::{DEFAULT_POI_FILES, POI_DIR_ENV, PoiResult, resolve_poi_dir};
use sa_spatial::{AccessibilityParams, DEFAULT_PATH_CACHE_CAPACITY, RoadTypeWeights, SnapTiers};

use crate::query::AnalysisQuery;
use crate::{AnalysisError, AnalysisResult, DistanceMode};

const DEFAULT_CATEGORY_WEIGHTS: &[(&str, f64)] = &[
    ("banks", 0.6),
    ("education", 1.0),
    ("health", 0.9),
    ("temples", 0.8),
    ("other", 0.9),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base directory for relative data paths.
    pub data_root:                  PathBuf,
    /// Road GeoJSON; `None` means `<data_root>/Data/Roadway.geojson`.
    pub road_geojson:               Option<PathBuf>,
    /// Write and reuse on-disk network caches next to the GeoJSON.
    pub network_cache:              bool,
    /// POI directory; `None` means env override, then the standard layouts.
    pub poi_dir:                    Option<PathBuf>,
    /// Category → expected CSV file name.
    pub poi_files:                  BTreeMap<String, String>,
    pub snap_tolerance_m:           f64,
    pub secondary_snap_tolerance_m: f64,
    pub decay_scale_km:             f64,
    pub radii_km:                   Vec<f64>,
    pub primary_radius_km:          f64,
    pub include_network:            bool,
    pub distance_mode:              DistanceMode,
    /// The entity's own category (competition index subject).
    pub own_category:               String,
    pub category_weights:           BTreeMap<String, f64>,
    pub road_type_weights:          RoadTypeWeights,
    pub road_start_share:           f64,
    pub path_cache_capacity:        usize,
    pub nearby_limit:               usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_root:                  PathBuf::from("."),
            road_geojson:               None,
            network_cache:              true,
            poi_dir:                    None,
            poi_files:                  DEFAULT_POI_FILES.iter().map(|(c, f)| ((*c).to_owned(), (*f).to_owned())).collect(),
            snap_tolerance_m:           120.0,
            secondary_snap_tolerance_m: 300.0,
            decay_scale_km:             1.0,
            radii_km:                   vec![0.25, 0.5, 1.0],
            primary_radius_km:          1.0,
            include_network:            true,
            distance_mode:              DistanceMode::Auto,
            own_category:               "cafes".to_owned(),
            category_weights:           DEFAULT_CATEGORY_WEIGHTS.iter().map(|(c, w)| ((*c).to_owned(), *w)).collect(),
            road_type_weights:          RoadTypeWeights::default(),
            road_start_share:           0.9,
            path_cache_capacity:        DEFAULT_PATH_CACHE_CAPACITY,
            nearby_limit:               10,
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file.  Missing keys keep their defaults.
    pub fn from_path(path: &Path) -> AnalysisResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| AnalysisError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    /// Reject settings no query could run with.
    pub fn validate(&self) -> AnalysisResult<()> {
        let bad = |msg: String| Err(AnalysisError::Config(msg));
        if !(self.snap_tolerance_m >= 0.0 && self.secondary_snap_tolerance_m >= 0.0) {
            return bad("snap tolerances must be non-negative".to_owned());
        }
        if !(self.primary_radius_km > 0.0 && self.primary_radius_km.is_finite()) {
            return bad(format!("primary_radius_km must be positive, got {}", self.primary_radius_km));
        }
        if !(0.0..=1.0).contains(&self.road_start_share) {
            return bad(format!("road_start_share must be within 0..=1, got {}", self.road_start_share));
        }
        if !self.poi_files.contains_key(&self.own_category) {
            return bad(format!("own_category `{}` has no POI file", self.own_category));
        }
        Ok(())
    }

    pub fn road_geojson_path(&self) -> PathBuf {
        self.road_geojson
            .clone()
            .unwrap_or_else(|| self.data_root.join("Data").join("Roadway.geojson"))
    }

    /// POI directory: explicit setting, then `SITEX_POI_DATA_DIR`, then the
    /// standard layouts under `data_root`.
    pub fn resolve_poi_dir(&self) -> PoiResult<PathBuf> {
        let env_dir = std::env::var_os(POI_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        let override_dir = self.poi_dir.clone().or(env_dir);
        resolve_poi_dir(&self.data_root, override_dir.as_deref())
    }

    pub fn snap_tiers(&self) -> SnapTiers {
        SnapTiers::new(self.snap_tolerance_m, self.secondary_snap_tolerance_m)
    }

    pub fn accessibility_params(&self, decay_scale_km: f64) -> AccessibilityParams {
        AccessibilityParams { decay_scale_km, start_share: self.road_start_share }
    }

    /// Importance of a non-own category in the composite score; 1.0 if unset.
    pub fn category_weight(&self, category: &str) -> f64 {
        self.category_weights.get(category).copied().unwrap_or(1.0)
    }

    /// A query around `center` carrying this configuration's defaults.
    pub fn query(&self, center: GeoPoint) -> AnalysisQuery {
        AnalysisQuery {
            center,
            radii_km:        self.radii_km.clone(),
            decay_scale_km:  self.decay_scale_km,
            include_network: self.include_network,
            mode:            self.distance_mode,
            categories:      None,
            limit:           self.nearby_limit,
        }
    }
}
