//! Site analysis facade.
//!
//! Owns the two lazily loaded road graphs (plain for POI distances, typed for
//! road accessibility) and the POI catalog, and runs every aggregation:
//!
//! | Operation                | Output                                        |
//! |--------------------------|-----------------------------------------------|
//! | [`nearby`]               | ranked POIs per category                      |
//! | [`ring_summary`]         | per-radius counts, weights and shares         |
//! | [`competition_index`]    | own-category crowding at one radius           |
//! | [`composite_index`]      | flat feature payload for the scoring model    |
//! | [`primary_features`]     | the same at the configured primary radius     |
//! | [`road_accessibility`]   | reachable road types and blended score        |
//! | [`path_between`]         | road-following polyline centre → POI          |
//!
//! A road graph that fails to load is logged once and treated as unusable
//! until its file changes; every query then falls back to haversine
//! distances instead of failing.
//!
//! [`nearby`]: SiteAnalysis::nearby
//! [`ring_summary`]: SiteAnalysis::ring_summary
//! [`competition_index`]: SiteAnalysis::competition_index
//! [`composite_index`]: SiteAnalysis::composite_index
//! [`primary_features`]: SiteAnalysis::primary_features
//! [`road_accessibility`]: SiteAnalysis::road_accessibility
//! [`path_between`]: SiteAnalysis::path_between

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use sa_core::{GeoPoint, RoadTypeId};
use sa_poi::PoiCatalog;
use sa_spatial::{LazyNetwork, PlainNetwork, SpatialError, TypedNetwork, default_cache_path};

use crate::competition::CompetitionIndex;
use crate::composite::{CompositeIndex, FeaturePayload};
use crate::distance::{CategoryDistances, measure_category};
use crate::nearby::{NearbyPoi, nearby_list};
use crate::query::AnalysisQuery;
use crate::report::RoadAccessibilityReport;
use crate::rings::{RingSummary, summarize_rings};
use crate::{AnalysisConfig, AnalysisError, AnalysisResult};

pub struct SiteAnalysis {
    config:  AnalysisConfig,
    plain:   LazyNetwork<()>,
    typed:   LazyNetwork<RoadTypeId>,
    catalog: PoiCatalog,
}

/// Categories measured in one query, plus whether network distances apply.
struct Measured {
    categories:     Vec<CategoryDistances>,
    network_usable: bool,
}

impl SiteAnalysis {
    /// Validate `config`, resolve the POI directory and set up the lazy road
    /// graphs.  Nothing is loaded until first use.
    pub fn new(config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let dir = config.resolve_poi_dir()?;
        info!(poi_dir = %dir.display(), "POI directory resolved");
        let catalog = PoiCatalog::new(dir, config.poi_files.iter().map(|(c, f)| (c.clone(), f.clone())));
        Ok(Self::with_catalog(config, catalog))
    }

    /// Use an already constructed catalog (skips directory resolution).
    pub fn with_catalog(config: AnalysisConfig, catalog: PoiCatalog) -> Self {
        let source = config.road_geojson_path();
        let (plain_cache, typed_cache) = if config.network_cache {
            (Some(default_cache_path::<()>(&source)), Some(default_cache_path::<RoadTypeId>(&source)))
        } else {
            (None, None)
        };
        let plain = LazyNetwork::new(source.clone(), plain_cache).with_path_cache_capacity(config.path_cache_capacity);
        let typed = LazyNetwork::new(source, typed_cache).with_path_cache_capacity(config.path_cache_capacity);
        Self { config, plain, typed, catalog }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PoiCatalog {
        &self.catalog
    }

    // ── Road graphs ───────────────────────────────────────────────────────────

    /// Plain road graph, or `None` if it cannot be loaded or has no nodes.
    pub fn road_network(&self) -> Option<Arc<PlainNetwork>> {
        match self.plain.get() {
            Ok(network) if network.is_empty() => None,
            Ok(network) => Some(network),
            Err(e @ SpatialError::LoadFailed { .. }) => {
                debug!(error = %e, "road network still unavailable");
                None
            }
            Err(e) => {
                warn!(source = %self.plain.source().display(), error = %e, "road network unavailable");
                None
            }
        }
    }

    /// Road-type tagged graph; same fallback rules as [`road_network`](Self::road_network).
    pub fn typed_network(&self) -> Option<Arc<TypedNetwork>> {
        match self.typed.get() {
            Ok(network) if network.is_empty() => None,
            Ok(network) => Some(network),
            Err(e @ SpatialError::LoadFailed { .. }) => {
                debug!(error = %e, "typed road network still unavailable");
                None
            }
            Err(e) => {
                warn!(source = %self.typed.source().display(), error = %e, "typed road network unavailable");
                None
            }
        }
    }

    // ── Measurement ───────────────────────────────────────────────────────────

    fn query_categories(&self, query: &AnalysisQuery) -> AnalysisResult<Vec<String>> {
        match &query.categories {
            None => Ok(self.catalog.categories().map(str::to_owned).collect()),
            Some(list) => {
                if let Some(unknown) = list.iter().find(|c| !self.catalog.has_category(c)) {
                    return Err(AnalysisError::InvalidParameter(format!("unknown POI category `{unknown}`")));
                }
                Ok(list.clone())
            }
        }
    }

    fn measure(&self, query: &AnalysisQuery) -> AnalysisResult<Measured> {
        query.validate()?;
        let network = if query.include_network { self.road_network() } else { None };
        let max_radius_km = query.max_radius_km();
        let tiers = self.config.snap_tiers();

        let started = Instant::now();
        let categories = self
            .query_categories(query)?
            .iter()
            .map(|category| -> AnalysisResult<CategoryDistances> {
                let pois = self.catalog.load(category)?;
                Ok(measure_category(category, pois, query.center, max_radius_km, network.as_deref(), tiers))
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        debug!(
            center = %query.center,
            max_radius_km,
            network = network.is_some(),
            categories = categories.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "categories measured"
        );
        Ok(Measured { categories, network_usable: network.is_some() })
    }

    /// Haversine and network distances of every POI within the query's
    /// largest radius, per category.
    pub fn measure_categories(&self, query: &AnalysisQuery) -> AnalysisResult<Vec<CategoryDistances>> {
        Ok(self.measure(query)?.categories)
    }

    // ── Aggregations ──────────────────────────────────────────────────────────

    /// Up to `query.limit` nearest POIs per category within the largest radius.
    pub fn nearby(&self, query: &AnalysisQuery) -> AnalysisResult<BTreeMap<String, Vec<NearbyPoi>>> {
        let measured = self.measure(query)?;
        let radius_km = query.max_radius_km();
        Ok(measured
            .categories
            .iter()
            .map(|m| {
                let list = nearby_list(m, radius_km, query.decay_scale_km, query.mode, measured.network_usable, query.limit);
                (m.category.clone(), list)
            })
            .collect())
    }

    pub fn ring_summary(&self, query: &AnalysisQuery) -> AnalysisResult<RingSummary> {
        let measured = self.measure(query)?;
        let rings = summarize_rings(
            &measured.categories,
            &query.normalized_radii(),
            query.decay_scale_km,
            query.mode,
            measured.network_usable,
        );
        Ok(RingSummary {
            center: query.center,
            distance_mode: query.mode,
            network_used: measured.network_usable,
            decay_scale_km: query.decay_scale_km,
            rings,
        })
    }

    /// Competition figures for the configured own category at `radius_km`.
    pub fn competition_index(&self, query: &AnalysisQuery, radius_km: f64) -> AnalysisResult<CompetitionIndex> {
        let summary = self.single_ring(query, radius_km)?;
        let ring = &summary.rings[0];
        Ok(CompetitionIndex::from_ring(query.center, ring, &self.config.own_category))
    }

    /// Composite index at `radius_km`, the matching competition index and,
    /// when `include_road` is set, the road accessibility report.
    pub fn composite_index(
        &self,
        query: &AnalysisQuery,
        radius_km: f64,
        include_road: bool,
    ) -> AnalysisResult<FeaturePayload> {
        let summary = self.single_ring(query, radius_km)?;
        let ring = &summary.rings[0];
        let categories: Vec<String> = self.query_categories(query)?;
        let own = self.config.own_category.as_str();

        let composite = CompositeIndex::from_ring(
            query.center,
            ring,
            categories.iter().map(String::as_str),
            own,
            |c| self.config.category_weight(c),
        );
        let competition = CompetitionIndex::from_ring(query.center, ring, own);
        let road_accessibility = if include_road {
            self.road_accessibility(query.center, radius_km, query.decay_scale_km)?
        } else {
            None
        };
        Ok(FeaturePayload { composite, competition, road_accessibility })
    }

    /// [`competition_index`](Self::competition_index) at the configured
    /// `primary_radius_km`.
    pub fn primary_competition_index(&self, query: &AnalysisQuery) -> AnalysisResult<CompetitionIndex> {
        self.competition_index(query, self.config.primary_radius_km)
    }

    /// [`composite_index`](Self::composite_index) at the configured
    /// `primary_radius_km`; this is the payload handed to the scoring model.
    pub fn primary_features(&self, query: &AnalysisQuery, include_road: bool) -> AnalysisResult<FeaturePayload> {
        self.composite_index(query, self.config.primary_radius_km, include_road)
    }

    fn single_ring(&self, query: &AnalysisQuery, radius_km: f64) -> AnalysisResult<RingSummary> {
        if !(radius_km > 0.0 && radius_km.is_finite()) {
            return Err(AnalysisError::InvalidParameter(format!("radius must be positive, got {radius_km}")));
        }
        self.ring_summary(&query.clone().radius(radius_km))
    }

    // ── Roads ─────────────────────────────────────────────────────────────────

    /// Road types reachable from `center` within `radius_km` of weighted
    /// network distance.
    ///
    /// `Ok(None)` when no typed graph is available or `center` cannot be
    /// snapped.
    pub fn road_accessibility(
        &self,
        center: GeoPoint,
        radius_km: f64,
        decay_scale_km: f64,
    ) -> AnalysisResult<Option<RoadAccessibilityReport>> {
        if !center.is_valid() {
            return Err(AnalysisError::InvalidParameter(format!("center {center} is not a valid coordinate")));
        }
        if !(radius_km > 0.0) {
            return Err(AnalysisError::InvalidParameter(format!("radius must be positive, got {radius_km}")));
        }
        let Some(network) = self.typed_network() else {
            return Ok(None);
        };
        let weights = &self.config.road_type_weights;
        let Some(map) = network.road_type_distance_map(center, radius_km * 1_000.0, self.config.snap_tiers(), weights)
        else {
            debug!(%center, "centre could not be snapped to the road network");
            return Ok(None);
        };
        let result = map.accessibility(weights, self.config.accessibility_params(decay_scale_km));
        Ok(Some(RoadAccessibilityReport { center, radius_km, decay_scale_km, result }))
    }

    /// Road-following polyline `[center, route nodes…, poi]`.
    ///
    /// `None` when the graph is unavailable, either end fails to snap, or the
    /// two snapped nodes are disconnected.
    pub fn path_between(&self, center: GeoPoint, poi: GeoPoint) -> Option<Vec<GeoPoint>> {
        let network = self.road_network()?;
        let tiers = self.config.snap_tiers();
        let from = network.snap_tiered(center, tiers)?;
        let to = network.snap_tiered(poi, tiers)?;
        let nodes = if from.node == to.node { vec![from.node] } else { network.route(from.node, to.node)? };

        let mut out = Vec::with_capacity(nodes.len() + 2);
        out.push(center);
        out.extend(nodes.iter().map(|n| network.node_pos[n.index()]));
        out.push(poi);
        Some(out)
    }
}
