//! Unit tests for sa-spatial.
//!
//! Networks are built from hand-placed vertices along a meridian near
//! Kathmandu so haversine lengths are exact multiples of the step size.

#[cfg(test)]
mod helpers {
    use std::f64::consts::PI;
    use std::path::{Path, PathBuf};

    use sa_core::{EARTH_RADIUS_M, GeoPoint};
    use serde_json::{Value, json};

    use crate::{RoadLine, RoadNetwork, RoadNetworkBuilder, TypedNetwork};

    pub const LAT0: f64 = 27.70;
    pub const LON0: f64 = 85.30;
    pub const EPS: f64 = 1e-6;

    fn m_per_deg_lat() -> f64 {
        EARTH_RADIUS_M * PI / 180.0
    }

    /// Point `m` metres north of the origin.
    pub fn north(m: f64) -> GeoPoint {
        GeoPoint::new(LAT0 + m / m_per_deg_lat(), LON0)
    }

    /// Point `m` metres east of `p`.
    pub fn east(p: GeoPoint, m: f64) -> GeoPoint {
        let m_per_deg_lon = m_per_deg_lat() * p.lat.to_radians().cos();
        GeoPoint::new(p.lat, p.lon + m / m_per_deg_lon)
    }

    /// A straight north-running road through the given offsets.
    pub fn straight_road(offsets_m: &[f64]) -> RoadNetwork {
        let coords: Vec<GeoPoint> = offsets_m.iter().map(|m| north(*m)).collect();
        let mut b = RoadNetworkBuilder::new();
        b.add_line(&coords, ()).unwrap();
        b.build()
    }

    pub fn line(road_type: &str, offsets_m: &[f64]) -> RoadLine {
        RoadLine { road_type: road_type.to_owned(), coords: offsets_m.iter().map(|m| north(*m)).collect() }
    }

    /// residential 0–100 m, primary 100–300 m, residential 300–600 m.
    pub fn mixed_typed() -> TypedNetwork {
        TypedNetwork::from_road_lines(&[
            line("residential", &[0.0, 100.0]),
            line("primary", &[100.0, 200.0, 300.0]),
            line("residential", &[300.0, 600.0]),
        ])
        .unwrap()
    }

    pub fn line_feature(highway: Value, offsets_m: &[f64]) -> Value {
        let coords: Vec<Value> = offsets_m.iter().map(|m| {
            let p = north(*m);
            json!([p.lon, p.lat])
        }).collect();
        json!({
            "type": "Feature",
            "properties": { "highway": highway },
            "geometry": { "type": "LineString", "coordinates": coords }
        })
    }

    pub fn write_collection(dir: &Path, name: &str, features: Vec<Value>) -> PathBuf {
        let path = dir.join(name);
        let fc = json!({ "type": "FeatureCollection", "features": features });
        std::fs::write(&path, serde_json::to_vec(&fc).unwrap()).unwrap();
        path
    }
}

// ── GeoJSON loader ────────────────────────────────────────────────────────────

#[cfg(test)]
mod geojson {
    use serde_json::json;

    use crate::parse_road_lines;

    #[test]
    fn skips_features_without_highway_tag() {
        let fc = json!({ "features": [
            { "properties": { "building": "yes" },
              "geometry": { "type": "LineString", "coordinates": [[85.3, 27.7], [85.31, 27.7]] } },
            { "properties": { "highway": " Primary " },
              "geometry": { "type": "LineString", "coordinates": [[85.3, 27.7], [85.31, 27.7]] } },
        ]});
        let lines = parse_road_lines(&fc);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].road_type, "primary");
    }

    #[test]
    fn area_highway_and_list_values() {
        let fc = json!({ "features": [
            { "properties": { "area:highway": "pedestrian" },
              "geometry": { "type": "LineString", "coordinates": [[85.3, 27.7], [85.31, 27.7]] } },
            { "properties": { "highway": ["service", "track"] },
              "geometry": { "type": "LineString", "coordinates": [[85.3, 27.7], [85.31, 27.7]] } },
            { "properties": { "highway": null },
              "geometry": { "type": "LineString", "coordinates": [[85.3, 27.7], [85.31, 27.7]] } },
        ]});
        let types: Vec<String> = parse_road_lines(&fc).into_iter().map(|l| l.road_type).collect();
        assert_eq!(types, vec!["pedestrian", "service"]);
    }

    #[test]
    fn malformed_positions_are_dropped_individually() {
        let fc = json!({ "features": [
            { "properties": { "highway": "residential" },
              "geometry": { "type": "LineString", "coordinates": [
                  [85.30, 27.70], ["x", 27.70], [85.31], null, [85.32, "27.71"]
              ] } },
        ]});
        let lines = parse_road_lines(&fc);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].coords.len(), 2);
        assert!((lines[0].coords[1].lat - 27.71).abs() < 1e-12);
    }

    #[test]
    fn polygon_rings_and_multipolygons() {
        let ring = json!([[85.30, 27.70], [85.31, 27.70], [85.31, 27.71], [85.30, 27.70]]);
        let fc = json!({ "features": [
            { "properties": { "highway": "pedestrian" },
              "geometry": { "type": "Polygon", "coordinates": [ring, ring] } },
            { "properties": { "highway": "service" },
              "geometry": { "type": "MultiPolygon", "coordinates": [[ring], [ring, ring]] } },
            { "properties": { "highway": "service" },
              "geometry": { "type": "Point", "coordinates": [85.30, 27.70] } },
        ]});
        let lines = parse_road_lines(&fc);
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.coords.len() == 4));
    }

    #[test]
    fn not_a_collection_is_empty() {
        assert!(parse_road_lines(&json!({ "type": "Feature" })).is_empty());
    }
}

// ── Builder & network structure ───────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use sa_core::{GeoPoint, NodeId, RoadTypeId};

    use super::helpers::{EPS, line, mixed_typed, north, straight_road};
    use crate::{PlainNetwork, RoadNetworkBuilder, TypedNetwork};

    #[test]
    fn empty_build() {
        let net = PlainNetwork::empty();
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.edge_count(), 0);
        assert!(net.is_empty());
    }

    #[test]
    fn shared_endpoint_is_one_node() {
        let net = PlainNetwork::from_road_lines(&[
            line("residential", &[0.0, 100.0]),
            line("residential", &[100.0, 250.0]),
        ])
        .unwrap();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 2);
        assert_eq!(net.degree(NodeId(1)), 2);
    }

    #[test]
    fn vertices_within_rounding_collapse() {
        let mut b = RoadNetworkBuilder::<()>::new();
        let a = b.node_at(GeoPoint::new(27.700_000_01, 85.3)).unwrap();
        let c = b.node_at(GeoPoint::new(27.700_000_04, 85.3)).unwrap();
        assert_eq!(a, c);
        // First vertex keeps its exact coordinate.
        assert_eq!(b.node_pos(a).lat, 27.700_000_01);
    }

    #[test]
    fn edge_weight_is_geodesic_length() {
        let net = straight_road(&[0.0, 1_000.0]);
        assert_eq!(net.edge_count(), 1);
        assert!((net.edge_length_m[0] - 1_000.0).abs() < EPS);
    }

    #[test]
    fn short_segments_are_skipped() {
        let net = straight_road(&[0.0, 0.3, 100.0]);
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 1);
        // The walk continues from the later vertex.
        assert!(net.edge_between(NodeId(1), NodeId(2)).is_some());
        assert!(net.edge_between(NodeId(0), NodeId(1)).is_none());
    }

    #[test]
    fn parallel_edges_keep_minimum() {
        let mut b = RoadNetworkBuilder::<RoadTypeId>::new();
        let a = b.node_at(north(0.0)).unwrap();
        let c = b.node_at(north(100.0)).unwrap();
        b.add_road(a, c, 200.0, RoadTypeId(0));
        b.add_road(c, a, 150.0, RoadTypeId(1));
        b.add_road(a, c, 180.0, RoadTypeId(2));
        let net = b.build();
        assert_eq!(net.edge_count(), 1);
        assert_eq!(net.edge_length_m[0], 150.0);
        assert_eq!(net.edge_tag[0], RoadTypeId(1));
    }

    #[test]
    fn self_loops_ignored() {
        let mut b = RoadNetworkBuilder::<()>::new();
        let a = b.node_at(north(0.0)).unwrap();
        b.add_road(a, a, 10.0, ());
        assert_eq!(b.edge_count(), 0);
    }

    #[test]
    fn typed_nodes_collect_every_touching_type() {
        let net = mixed_typed();
        let at_100 = net.nearest_node(north(100.0)).unwrap();
        assert_eq!(net.road_types_for_node(at_100), vec!["primary", "residential"]);
        let at_0 = net.nearest_node(north(0.0)).unwrap();
        assert_eq!(net.road_types_for_node(at_0), vec!["residential"]);
        assert_eq!(net.road_types.len(), 2);
    }

    #[test]
    fn plain_nodes_carry_no_tags() {
        let net = straight_road(&[0.0, 100.0]);
        assert!(net.node_tags(NodeId(0)).is_empty());
        assert!(net.node_tags(NodeId(99)).is_empty());
    }

    #[test]
    fn neighbors_are_symmetric() {
        let net: TypedNetwork = mixed_typed();
        for n in 0..net.node_count() as u32 {
            for (m, e) in net.neighbors(NodeId(n)) {
                assert!(net.neighbors(m).any(|(back, e2)| back == NodeId(n) && e2 == e));
            }
        }
    }
}

// ── Spatial snap ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod snap {
    use sa_core::{GeoPoint, NodeId};

    use super::helpers::{east, north, straight_road};
    use crate::{PlainNetwork, SnapTiers, UNBOUNDED_TOLERANCE_M};

    #[test]
    fn exact_node_has_zero_offset() {
        let net = straight_road(&[0.0, 500.0, 1_000.0]);
        let s = net.snap(north(500.0), 0.0).unwrap();
        assert_eq!(s.node, NodeId(1));
        assert_eq!(s.offset_m, 0.0);
    }

    #[test]
    fn larger_tolerance_keeps_the_same_node() {
        let net = straight_road(&[0.0, 500.0, 1_000.0]);
        let p = east(north(500.0), 50.0);
        assert!(net.snap(p, 40.0).is_none());
        let tight = net.snap(p, 60.0).unwrap();
        let loose = net.snap(p, 10_000.0).unwrap();
        assert_eq!(tight.node, loose.node);
        assert!((tight.offset_m - 50.0).abs() < 0.01);
    }

    #[test]
    fn degenerate_inputs_never_snap() {
        let net = straight_road(&[0.0, 500.0]);
        assert!(net.snap(north(0.0), -1.0).is_none());
        assert!(net.snap(north(0.0), f64::NAN).is_none());
        assert!(net.snap(GeoPoint::new(f64::NAN, 85.3), UNBOUNDED_TOLERANCE_M).is_none());
    }

    #[test]
    fn empty_network_never_snaps() {
        let net = PlainNetwork::empty();
        assert!(net.snap(north(0.0), UNBOUNDED_TOLERANCE_M).is_none());
        assert!(net.snap_tiered(north(0.0), SnapTiers::default()).is_none());
        assert!(net.snap_batch_tiered(&[north(0.0)], SnapTiers::default())[0].is_none());
    }

    #[test]
    fn tiers_escalate_to_unbounded() {
        let net = straight_road(&[0.0, 1_000.0]);
        let points = [east(north(0.0), 50.0), east(north(0.0), 200.0), east(north(1_000.0), 5_000.0)];
        let snaps = net.snap_batch_tiered(&points, SnapTiers::new(120.0, 300.0));
        assert!(snaps.iter().all(Option::is_some));
        assert!((snaps[0].unwrap().offset_m - 50.0).abs() < 0.01);
        assert!((snaps[1].unwrap().offset_m - 200.0).abs() < 0.01);
        assert_eq!(snaps[2].unwrap().node, NodeId(1));

        assert!(net.snap_batch(&points, 120.0)[1].is_none());
        assert_eq!(net.snap_tiered(points[1], SnapTiers::new(120.0, 300.0)), snaps[1]);
    }

    #[test]
    fn tree_index_agrees_with_linear_scan() {
        // 200 nodes forces the R-tree path.
        let offsets: Vec<f64> = (0..200).map(|i| i as f64 * 25.0).collect();
        let net = straight_road(&offsets);
        assert_eq!(net.node_count(), 200);

        let queries: Vec<GeoPoint> = (0..300).map(|i| east(north(i as f64 * 16.0), 5.0)).collect();
        let batch = net.snap_batch(&queries, UNBOUNDED_TOLERANCE_M);
        for (q, got) in queries.iter().zip(&batch) {
            let expect = (0..net.node_count())
                .min_by(|&a, &b| {
                    q.distance_m(net.node_pos[a]).total_cmp(&q.distance_m(net.node_pos[b]))
                })
                .unwrap();
            assert_eq!(got.unwrap().node, NodeId(expect as u32));
            assert_eq!(*got, net.snap(*q, UNBOUNDED_TOLERANCE_M));
        }
    }
}

// ── Shortest paths ────────────────────────────────────────────────────────────

#[cfg(test)]
mod paths {
    use std::sync::Arc;

    use sa_core::NodeId;

    use super::helpers::{EPS, east, north, straight_road};
    use crate::UNBOUNDED_TOLERANCE_M;

    #[test]
    fn cutoff_bounds_every_distance() {
        let net = straight_road(&[0.0, 200.0, 400.0, 600.0, 800.0, 1_000.0]);
        let tree = net.shortest_paths_from(NodeId(0), 500.0);
        assert_eq!(tree.distance_to(NodeId(0)), Some(0.0));
        assert_eq!(tree.len(), 3);
        assert!(tree.iter().all(|(_, d)| d <= 500.0));
        assert!(tree.distance_to(NodeId(3)).is_none());
        assert!((tree.distance_to(NodeId(2)).unwrap() - 400.0).abs() < EPS);
    }

    #[test]
    fn settle_order_is_non_decreasing() {
        let net = straight_road(&[0.0, 200.0, 400.0, 600.0]);
        let tree = net.shortest_paths_from(NodeId(2), f64::INFINITY);
        let dists: Vec<f64> = tree.iter().map(|(_, d)| d).collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn invalid_source_or_cutoff_is_empty() {
        let net = straight_road(&[0.0, 200.0]);
        assert!(net.shortest_paths_from(NodeId(9), 1_000.0).is_empty());
        assert!(net.shortest_paths_from(NodeId(0), -1.0).is_empty());
        assert!(net.shortest_paths_from(NodeId(0), f64::NAN).is_empty());
        let zero = net.shortest_paths_from(NodeId(0), 0.0);
        assert_eq!(zero.len(), 1);
    }

    #[test]
    fn repeated_query_hits_cache() {
        let net = straight_road(&[0.0, 200.0, 400.0]);
        let a = net.shortest_paths_from(NodeId(0), 300.0);
        let b = net.shortest_paths_from(NodeId(0), 300.0);
        assert!(Arc::ptr_eq(&a, &b));
        let c = net.shortest_paths_from(NodeId(0), 301.0);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(net.path_cache_len(), 2);
    }

    #[test]
    fn cache_evicts_least_recent() {
        let net = straight_road(&[0.0, 200.0, 400.0]).with_path_cache_capacity(2);
        let first = net.shortest_paths_from(NodeId(0), 100.0);
        net.shortest_paths_from(NodeId(1), 100.0);
        net.shortest_paths_from(NodeId(2), 100.0);
        assert_eq!(net.path_cache_len(), 2);
        let again = net.shortest_paths_from(NodeId(0), 100.0);
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn zero_capacity_still_caches_one() {
        let net = straight_road(&[0.0, 200.0]).with_path_cache_capacity(0);
        net.shortest_paths_from(NodeId(0), 100.0);
        assert_eq!(net.path_cache_len(), 1);
    }

    #[test]
    fn distance_between_same_node_sums_offsets() {
        let net = straight_road(&[0.0, 1_000.0]);
        let a = east(north(0.0), 10.0);
        let b = east(north(0.0), -20.0);
        let d = net.distance_between(a, b, 100.0).unwrap();
        assert!((d - 30.0).abs() < 0.01);
        assert_eq!(net.path_cache_len(), 0);
    }

    #[test]
    fn distance_between_along_road() {
        let net = straight_road(&[0.0, 200.0, 800.0, 1_000.0]);
        let d = net.distance_between(north(0.0), north(800.0), 1.0).unwrap();
        assert!((d - 800.0).abs() < EPS);
        assert!(net.distance_between(north(0.0), east(north(800.0), 500.0), 100.0).is_none());
    }

    #[test]
    fn disconnected_components_have_no_distance() {
        let net = crate::PlainNetwork::from_road_lines(&[
            super::helpers::line("residential", &[0.0, 100.0]),
            super::helpers::line("residential", &[500.0, 600.0]),
        ])
        .unwrap();
        assert!(net.distance_between(north(0.0), north(600.0), UNBOUNDED_TOLERANCE_M).is_none());
        assert!(net.route(NodeId(0), NodeId(3)).is_none());
    }

    #[test]
    fn route_follows_the_road() {
        let net = straight_road(&[0.0, 200.0, 400.0, 600.0]);
        assert_eq!(net.route(NodeId(0), NodeId(3)), Some(vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]));
        assert_eq!(net.route(NodeId(2), NodeId(2)), Some(vec![NodeId(2)]));
        assert_eq!(net.route(NodeId(0), NodeId(40)), None);
    }

    #[test]
    fn weighted_search_skips_invalid_costs() {
        let net = straight_road(&[0.0, 200.0, 400.0]);
        let tree = net.shortest_paths_weighted(NodeId(0), f64::INFINITY, |e| if e.0 == 1 { f64::NAN } else { 1.0 });
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.distance_to(NodeId(1)), Some(1.0));
    }
}

// ── Road-type accessibility ───────────────────────────────────────────────────

#[cfg(test)]
mod road_types {
    use super::helpers::{EPS, east, mixed_typed, north};
    use crate::{AccessibilityParams, RoadTypeWeights, SnapTiers, TypedNetwork};

    #[test]
    fn start_types_are_excluded_from_reached() {
        let net = mixed_typed();
        let map = net
            .road_type_distance_map(north(0.0), 1_000.0, SnapTiers::default(), &RoadTypeWeights::default())
            .unwrap();
        assert_eq!(map.start_types, vec!["residential"]);
        assert!(!map.reached.contains_key("residential"));
        let primary = &map.reached["primary"];
        assert!((primary.distance_m - 100.0).abs() < EPS);
        assert!((primary.point.lat - north(100.0).lat).abs() < 1e-12);
    }

    #[test]
    fn edge_cost_uses_multiplier_and_cutoff() {
        let net = mixed_typed();
        // Start on the primary stretch; reaching residential at 300 m costs
        // 100 m of primary at 1.4.
        let map = net
            .road_type_distance_map(north(200.0), 1_000.0, SnapTiers::default(), &RoadTypeWeights::default())
            .unwrap();
        assert_eq!(map.start_types, vec!["primary"]);
        assert!((map.reached["residential"].distance_m - 140.0).abs() < EPS);

        let tight = net
            .road_type_distance_map(north(200.0), 100.0, SnapTiers::default(), &RoadTypeWeights::default())
            .unwrap();
        assert!(tight.reached.is_empty());
    }

    #[test]
    fn distances_include_centre_offset() {
        let net = mixed_typed();
        let map = net
            .road_type_distance_map(east(north(0.0), 30.0), 1_000.0, SnapTiers::default(), &RoadTypeWeights::default())
            .unwrap();
        assert!((map.center.offset_m - 30.0).abs() < 0.01);
        assert!((map.reached["primary"].distance_m - 130.0).abs() < 0.01);
    }

    #[test]
    fn empty_network_has_no_map() {
        let net = TypedNetwork::empty();
        assert!(net
            .road_type_distance_map(north(0.0), 1_000.0, SnapTiers::default(), &RoadTypeWeights::default())
            .is_none());
    }

    #[test]
    fn accessibility_score_blends_start_and_reach() {
        let net = mixed_typed();
        let weights = RoadTypeWeights::default();
        let map = net.road_type_distance_map(north(0.0), 1_000.0, SnapTiers::default(), &weights).unwrap();
        let result = map.accessibility(&weights, AccessibilityParams::default());

        assert_eq!(result.snap.road_types, vec!["residential"]);
        assert_eq!(result.reachable.len(), 1);
        let r = &result.reachable[0];
        assert_eq!(r.weight, 1.4);
        assert!((r.distance_km - 0.1).abs() < 1e-9);
        assert!((r.decayed_weight - 1.4 * (-0.1f64).exp()).abs() < 1e-9);
        assert!((result.total_decayed_weight - r.decayed_weight).abs() < 1e-12);

        let expected = 100.0 * (0.9 * (1.0 / 1.6) + 0.1 * (1.4 / 1.6) * (-0.1f64).exp());
        assert!((result.score - expected).abs() < 1e-9);
    }

    #[test]
    fn weights_table_defaults_and_json() {
        let w = RoadTypeWeights::default();
        assert_eq!(w.multiplier("motorway"), 1.6);
        assert_eq!(w.multiplier("footway"), 0.7);
        assert_eq!(w.multiplier("bridleway"), 1.0);
        assert_eq!(w.max_multiplier(), 1.6);

        let json = br#"{"Motorway": 2.0, "track": -1.0, "path": 0.5}"#;
        let custom = RoadTypeWeights::from_reader(&json[..]).unwrap();
        assert_eq!(custom.multiplier("motorway"), 2.0);
        assert_eq!(custom.multiplier("track"), 1.0);
        assert_eq!(custom.len(), 2);
    }
}

// ── Persistence cache ─────────────────────────────────────────────────────────

#[cfg(test)]
mod persist {
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    use serde_json::json;
    use tempfile::tempdir;

    use super::helpers::{line_feature, north, write_collection};
    use crate::{
        CACHE_SCHEMA_VERSION, CacheMiss, NetworkParts, PlainNetwork, SpatialError, TypedNetwork,
        UNBOUNDED_TOLERANCE_M, default_cache_path, load_cache, load_or_build, read_road_lines, save_cache,
    };

    fn fixture(dir: &std::path::Path) -> std::path::PathBuf {
        write_collection(
            dir,
            "roads.geojson",
            vec![
                line_feature(json!("residential"), &[0.0, 100.0, 250.0]),
                line_feature(json!("primary"), &[250.0, 600.0, 1_000.0]),
            ],
        )
    }

    fn backdate(path: &std::path::Path, secs: u64) {
        let f = File::options().write(true).open(path).unwrap();
        f.set_modified(SystemTime::now() - Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn round_trip_preserves_structure() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let cache = default_cache_path::<sa_core::RoadTypeId>(&src);

        let built: TypedNetwork = load_or_build(&src, Some(&cache)).unwrap();
        assert!(cache.exists());
        let loaded: TypedNetwork = load_cache(&cache, &src).unwrap();

        assert_eq!(loaded.node_count(), built.node_count());
        assert_eq!(loaded.edge_count(), built.edge_count());
        assert_eq!(loaded.road_types, built.road_types);
        assert_eq!(loaded.node_tags, built.node_tags);
        assert_eq!(loaded.snap(north(250.0), 1.0), built.snap(north(250.0), 1.0));
    }

    #[test]
    fn cache_paths_differ_per_kind() {
        let src = std::path::Path::new("/data/Roadway.geojson");
        assert_ne!(default_cache_path::<()>(src), default_cache_path::<sa_core::RoadTypeId>(src));
    }

    #[test]
    fn kind_mismatch_is_a_miss() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let cache = dir.path().join("shared.cache");
        let plain: PlainNetwork = load_or_build(&src, Some(&cache)).unwrap();
        assert!(!plain.is_empty());
        let miss = load_cache::<sa_core::RoadTypeId>(&cache, &src).err().unwrap();
        assert!(matches!(miss, CacheMiss::KindMismatch { .. }));
        // load_or_build recovers by rebuilding the requested kind.
        let typed: TypedNetwork = load_or_build(&src, Some(&cache)).unwrap();
        assert_eq!(typed.road_types.len(), 2);
    }

    #[test]
    fn stale_cache_is_rebuilt() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let cache = dir.path().join("roads.cache");
        let net: PlainNetwork = load_or_build(&src, Some(&cache)).unwrap();
        save_cache(&net, &cache).unwrap();

        backdate(&cache, 3_600);
        assert_eq!(load_cache::<()>(&cache, &src).err(), Some(CacheMiss::Stale));

        let _: PlainNetwork = load_or_build(&src, Some(&cache)).unwrap();
        assert!(load_cache::<()>(&cache, &src).is_ok());
    }

    #[test]
    fn schema_mismatch_is_a_miss() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let cache = dir.path().join("roads.cache");
        std::fs::write(&cache, bincode::serialize(&(99u32, "plain".to_owned())).unwrap()).unwrap();
        assert_eq!(
            load_cache::<()>(&cache, &src).err(),
            Some(CacheMiss::SchemaMismatch { found: 99, expected: CACHE_SCHEMA_VERSION })
        );
    }

    #[test]
    fn corrupt_cache_is_a_miss_not_an_error() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let cache = dir.path().join("roads.cache");
        std::fs::write(&cache, [1u8, 0]).unwrap();
        assert!(matches!(load_cache::<()>(&cache, &src), Err(CacheMiss::Corrupt(_))));

        let net: PlainNetwork = load_or_build(&src, Some(&cache)).unwrap();
        assert_eq!(net.node_count(), 5);
        assert!(load_cache::<()>(&cache, &src).is_ok());
    }

    #[test]
    fn missing_source_is_fatal_even_with_cache() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let cache = dir.path().join("roads.cache");
        let _: PlainNetwork = load_or_build(&src, Some(&cache)).unwrap();
        std::fs::remove_file(&src).unwrap();
        let err = load_or_build::<()>(&src, Some(&cache)).err().unwrap();
        assert!(matches!(err, SpatialError::SourceMissing(_)));
    }

    #[test]
    fn empty_collection_builds_empty_network() {
        let dir = tempdir().unwrap();
        let src = write_collection(dir.path(), "empty.geojson", vec![]);
        assert!(read_road_lines(&src).unwrap().is_empty());
        let net: PlainNetwork = load_or_build(&src, None).unwrap();
        assert_eq!(net.node_count(), 0);
        assert!(net.snap(north(0.0), UNBOUNDED_TOLERANCE_M).is_none());
    }

    #[test]
    fn failed_save_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let src = fixture(dir.path());
        let net: PlainNetwork = load_or_build(&src, None).unwrap();

        // A non-empty directory under the cache name makes the final rename fail.
        let cache = dir.path().join("roads.cache");
        std::fs::create_dir(&cache).unwrap();
        std::fs::write(cache.join("keep"), b"x").unwrap();

        assert!(matches!(save_cache(&net, &cache), Err(SpatialError::Io(_))));
        assert!(!dir.path().join("roads.cache.tmp").exists());
        assert!(cache.join("keep").exists());
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let dir = tempdir().unwrap();
        let net: PlainNetwork = load_or_build(&fixture(dir.path()), None).unwrap();
        let mut parts = NetworkParts {
            node_pos:       net.node_pos.clone(),
            edge_ends:      net.edge_ends.clone(),
            edge_length_m:  net.edge_length_m.clone(),
            edge_tag:       net.edge_tag.clone(),
            node_tag_start: net.node_tag_start.clone(),
            node_tags:      net.node_tags.clone(),
            road_types:     net.road_types.clone(),
        };
        assert!(PlainNetwork::from_parts(parts.clone()).is_ok());

        parts.node_pos[1].lat = f64::NAN;
        assert!(matches!(PlainNetwork::from_parts(parts), Err(SpatialError::InvalidNetwork(_))));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("broken.geojson");
        std::fs::write(&src, "{ not json").unwrap();
        assert!(matches!(load_or_build::<()>(&src, None), Err(SpatialError::GeoJson(_))));
    }
}

// ── Lazy handle ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod lazy {
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use serde_json::json;
    use tempfile::tempdir;

    use super::helpers::{line_feature, write_collection};
    use crate::{LazyNetwork, SpatialError};

    #[test]
    fn failed_load_is_retried() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("roads.geojson");
        let lazy: LazyNetwork = LazyNetwork::new(&src, None).with_path_cache_capacity(3);

        assert!(lazy.get().is_err());
        assert!(!lazy.is_loaded());

        write_collection(dir.path(), "roads.geojson", vec![line_feature(json!("primary"), &[0.0, 100.0])]);
        let net = lazy.get().unwrap();
        assert_eq!(net.node_count(), 2);
        assert!(lazy.is_loaded());
        assert!(Arc::ptr_eq(&net, &lazy.get().unwrap()));
        assert_eq!(lazy.source(), src.as_path());
    }

    #[test]
    fn failure_is_remembered_until_the_source_changes() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("roads.geojson");
        std::fs::write(&src, "{ not json").unwrap();
        let lazy: LazyNetwork = LazyNetwork::new(&src, None);

        assert!(matches!(lazy.get(), Err(SpatialError::GeoJson(_))));
        assert!(matches!(lazy.get(), Err(SpatialError::LoadFailed { .. })));

        write_collection(dir.path(), "roads.geojson", vec![line_feature(json!("primary"), &[0.0, 100.0])]);
        let f = std::fs::File::options().write(true).open(&src).unwrap();
        f.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();
        drop(f);

        assert_eq!(lazy.get().unwrap().node_count(), 2);
        assert!(lazy.is_loaded());
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        let dir = tempdir().unwrap();
        let src = write_collection(dir.path(), "roads.geojson", vec![line_feature(json!("primary"), &[0.0, 100.0])]);
        let lazy: LazyNetwork = LazyNetwork::new(&src, None);
        let nets: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| lazy.get().unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(nets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
