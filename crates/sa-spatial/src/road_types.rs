//! Road-category weighting and accessibility scoring.
//!
//! # Pipeline
//!
//! ```text
//! query point ──snap_tiered──► centre node ──weighted Dijkstra (cutoff)──►
//!     per road type: min distance + representative node   (RoadTypeDistanceMap)
//!         ──accessibility(weights, params)──►  AccessibilityResult (0–100 score)
//! ```
//!
//! Edge cost during the search is `length_m * multiplier(edge road type)`.
//! Road types present at the centre node ("start types") never appear in the
//! reached set.
//!
//! # Score
//!
//! ```text
//! start  = max multiplier of the start types / max multiplier
//! reach  = max over reached types of (multiplier / max) · exp(−km / decay_km)
//! score  = 100 · (share · start + (1 − share) · reach)
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sa_core::{GeoPoint, NodeId, RoadTypeId};

use crate::network::TypedNetwork;
use crate::snap::{Snap, SnapTiers};
use crate::{SpatialError, SpatialResult};

/// Multiplier for any road type absent from the table.
const DEFAULT_MULTIPLIER: f64 = 1.0;

const DEFAULT_TABLE: &[(&str, f64)] = &[
    ("motorway", 1.6),
    ("trunk", 1.5),
    ("primary", 1.4),
    ("secondary", 1.3),
    ("tertiary", 1.2),
    ("residential", 1.0),
    ("unclassified", 1.0),
    ("road", 1.0),
    ("service", 0.9),
    ("living_street", 0.9),
    ("track", 0.8),
    ("path", 0.8),
    ("cycleway", 0.8),
    ("footway", 0.7),
    ("pedestrian", 0.7),
    ("steps", 0.7),
    ("construction", 1.1),
];

// ── RoadTypeWeights ───────────────────────────────────────────────────────────

/// Road category → multiplier table.  Serialises as a flat JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadTypeWeights {
    table: BTreeMap<String, f64>,
}

impl Default for RoadTypeWeights {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
        }
    }
}

impl RoadTypeWeights {
    /// Build from explicit entries.  Keys are normalised like GeoJSON tags;
    /// entries that are not finite and positive are dropped.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut table = BTreeMap::new();
        for (name, mult) in entries {
            let key = name.as_ref().trim().to_lowercase();
            if mult.is_finite() && mult > 0.0 && !key.is_empty() {
                table.insert(key, mult);
            } else {
                warn!(road_type = %key, multiplier = mult, "ignoring invalid road type multiplier");
            }
        }
        Self { table }
    }

    /// Parse a `{"motorway": 1.6, ...}` object.
    pub fn from_reader<R: Read>(reader: R) -> SpatialResult<Self> {
        let raw: BTreeMap<String, f64> = serde_json::from_reader(reader)?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_path(path: &Path) -> SpatialResult<Self> {
        if !path.exists() {
            return Err(SpatialError::SourceMissing(path.to_path_buf()));
        }
        let weights = Self::from_reader(BufReader::new(File::open(path)?))?;
        debug!(path = %path.display(), entries = weights.len(), "loaded road type weights");
        Ok(weights)
    }

    /// Multiplier for `road_type`; unknown types get 1.0.
    pub fn multiplier(&self, road_type: &str) -> f64 {
        self.table.get(road_type).copied().unwrap_or(DEFAULT_MULTIPLIER)
    }

    /// Largest multiplier any road type can have, including the implicit
    /// default for unknown types.
    pub fn max_multiplier(&self) -> f64 {
        self.table.values().copied().fold(DEFAULT_MULTIPLIER, f64::max)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.table.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ── Distance map ──────────────────────────────────────────────────────────────

/// A concrete node standing in for a reached road type.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct RoadPoint {
    pub node_id: NodeId,
    pub lat:     f64,
    pub lon:     f64,
}

/// Closest occurrence of one road type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReachedRoadType {
    pub road_type:  String,
    /// Weighted path cost plus the centre snap offset, in metres.
    pub distance_m: f64,
    pub point:      RoadPoint,
}

/// Output of [`TypedNetwork::road_type_distance_map`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoadTypeDistanceMap {
    pub center:      Snap,
    /// Sorted road types at the centre node.
    pub start_types: Vec<String>,
    /// Every other reached road type, keyed by name.
    pub reached:     BTreeMap<String, ReachedRoadType>,
}

impl TypedNetwork {
    /// Nearest weighted distance to every road type other than the ones at
    /// the snapped centre.
    ///
    /// `None` only when the centre cannot be snapped at all (empty network
    /// or non-finite `pos`).
    ///
    /// For each type the first settled node with the smallest distance wins;
    /// later nodes replace it only when strictly closer.
    pub fn road_type_distance_map(
        &self,
        pos: GeoPoint,
        radius_m: f64,
        tiers: SnapTiers,
        weights: &RoadTypeWeights,
    ) -> Option<RoadTypeDistanceMap> {
        let center = self.snap_tiered(pos, tiers)?;

        let factors: Vec<f64> = self.road_types.iter().map(|(_, name)| weights.multiplier(name)).collect();
        let tree = self.shortest_paths_weighted(center.node, radius_m, |e| {
            let factor = factors.get(self.edge_tag[e.index()].index()).copied().unwrap_or(DEFAULT_MULTIPLIER);
            self.edge_length_m[e.index()] * factor
        });

        let start: &[RoadTypeId] = self.node_tags(center.node);
        let mut best: BTreeMap<RoadTypeId, (f64, NodeId)> = BTreeMap::new();
        for (node, dist) in tree.iter() {
            let total = dist + center.offset_m;
            for &tag in self.node_tags(node) {
                if start.contains(&tag) {
                    continue;
                }
                match best.entry(tag) {
                    Entry::Vacant(slot) => {
                        slot.insert((total, node));
                    }
                    Entry::Occupied(mut slot) if total < slot.get().0 => {
                        slot.insert((total, node));
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }

        let reached = best
            .into_iter()
            .map(|(tag, (distance_m, node))| {
                let name = self.road_types.name(tag).to_owned();
                let pos = self.node_pos[node.index()];
                let point = RoadPoint { node_id: node, lat: pos.lat, lon: pos.lon };
                (name.clone(), ReachedRoadType { road_type: name, distance_m, point })
            })
            .collect();

        let start_types = self.road_types_for_node(center.node).into_iter().map(str::to_owned).collect();
        debug!(node = %center.node, offset_m = center.offset_m, settled = tree.len(), "road type distance map");

        Some(RoadTypeDistanceMap { center, start_types, reached })
    }
}

// ── Accessibility report ──────────────────────────────────────────────────────

/// Knobs for [`RoadTypeDistanceMap::accessibility`].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityParams {
    pub decay_scale_km: f64,
    /// Share of the score given to the road class at the query point.
    pub start_share:    f64,
}

impl Default for AccessibilityParams {
    fn default() -> Self {
        Self { decay_scale_km: 1.0, start_share: 0.9 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapInfo {
    pub node_id:         NodeId,
    pub snap_distance_m: f64,
    pub road_types:      Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReachableRoadType {
    pub road_type:      String,
    pub distance_km:    f64,
    pub weight:         f64,
    pub decayed_weight: f64,
    pub point:          RoadPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccessibilityResult {
    pub snap:                 SnapInfo,
    /// Ascending by distance.
    pub reachable:            Vec<ReachableRoadType>,
    pub total_decayed_weight: f64,
    /// Blended score in `0.0..=100.0`.
    pub score:                f64,
}

/// `weight · exp(−km / decay_km)`; a non-positive decay scale disables decay.
fn decayed(weight: f64, distance_km: f64, decay_scale_km: f64) -> f64 {
    if decay_scale_km > 0.0 && decay_scale_km.is_finite() {
        weight * (-distance_km / decay_scale_km).exp()
    } else {
        weight
    }
}

impl RoadTypeDistanceMap {
    /// Attach multipliers and decay to every reached type and compute the
    /// blended score.
    pub fn accessibility(&self, weights: &RoadTypeWeights, params: AccessibilityParams) -> AccessibilityResult {
        let mut reachable: Vec<ReachableRoadType> = self
            .reached
            .values()
            .map(|r| {
                let weight = weights.multiplier(&r.road_type);
                let distance_km = r.distance_m / 1_000.0;
                ReachableRoadType {
                    road_type: r.road_type.clone(),
                    distance_km,
                    weight,
                    decayed_weight: decayed(weight, distance_km, params.decay_scale_km),
                    point: r.point,
                }
            })
            .collect();
        reachable.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km).then_with(|| a.road_type.cmp(&b.road_type)));

        let total_decayed_weight = reachable.iter().map(|r| r.decayed_weight).sum();

        let max = weights.max_multiplier();
        let start_score = self
            .start_types
            .iter()
            .map(|t| weights.multiplier(t) / max)
            .fold(0.0, f64::max);
        let reach_score = reachable.iter().map(|r| r.decayed_weight / max).fold(0.0, f64::max);
        let share = params.start_share.clamp(0.0, 1.0);
        let score = (100.0 * (share * start_score + (1.0 - share) * reach_score)).clamp(0.0, 100.0);

        AccessibilityResult {
            snap: SnapInfo {
                node_id:         self.center.node,
                snap_distance_m: self.center.offset_m,
                road_types:      self.start_types.clone(),
            },
            reachable,
            total_decayed_weight,
            score,
        }
    }
}
