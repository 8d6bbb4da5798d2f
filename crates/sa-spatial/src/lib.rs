//! `sa-spatial` — road network, snapping, shortest paths, and road-type
//! accessibility.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                      |
//! |----------------|---------------------------------------------------------------|
//! | [`geojson`]    | `read_road_lines`, `parse_road_lines`, `RoadLine`             |
//! | [`tags`]       | `EdgeTag` (plain `()` vs `RoadTypeId`), `RoadTypeRegistry`    |
//! | [`network`]    | `RoadNetwork<T>` (CSR + nearest-node index), builder          |
//! | [`snap`]       | `Snap`, `SnapTiers`, single/batch/tiered snapping             |
//! | [`paths`]      | `PathTree`, cutoff-bounded Dijkstra, per-network path cache   |
//! | [`road_types`] | `RoadTypeWeights`, distance map, `AccessibilityResult`        |
//! | [`persist`]    | Versioned on-disk cache, `load_or_build`                      |
//! | [`lazy`]       | `LazyNetwork<T>` build-once handle                            |
//! | [`error`]      | `SpatialError`, `SpatialResult<T>`                            |
//!
//! # Two variants, one graph
//!
//! [`PlainNetwork`] (`RoadNetwork<()>`) carries distances only.
//! [`TypedNetwork`] (`RoadNetwork<RoadTypeId>`) additionally records the road
//! category of every edge and the set of categories touching every node.
//! Builder, snapper, path engine and cache are shared.

pub mod error;
pub mod geojson;
pub mod lazy;
pub mod network;
pub mod paths;
pub mod persist;
pub mod road_types;
pub mod snap;
pub mod tags;

#[cfg(test)]
mod tests;

pub use error::{SpatialError, SpatialResult};
pub use geojson::{RoadLine, parse_road_lines, read_road_lines, read_road_lines_from};
pub use lazy::LazyNetwork;
pub use network::{
    DEDUP_DECIMALS, MIN_EDGE_LENGTH_M, NetworkParts, PlainNetwork, RoadNetwork, RoadNetworkBuilder,
    TypedNetwork,
};
pub use paths::{DEFAULT_PATH_CACHE_CAPACITY, PathTree};
pub use persist::{
    CACHE_SCHEMA_VERSION, CacheMiss, cache_is_fresh, default_cache_path, load_cache, load_or_build,
    save_cache,
};
pub use road_types::{
    AccessibilityParams, AccessibilityResult, ReachableRoadType, ReachedRoadType, RoadPoint,
    RoadTypeDistanceMap, RoadTypeWeights, SnapInfo,
};
pub use snap::{Snap, SnapTiers, UNBOUNDED_TOLERANCE_M};
pub use tags::{EdgeTag, RoadTypeRegistry};
