//! GeoJSON road geometry loader.
//!
//! # Usage
//!
//! ```ignore
//! use std::path::Path;
//! use sa_spatial::{read_road_lines, PlainNetwork};
//!
//! let lines = read_road_lines(Path::new("Data/Roadway.geojson"))?;
//! let network = PlainNetwork::from_road_lines(&lines)?;
//! ```
//!
//! # What is loaded
//!
//! Only features whose properties carry `highway` (or, failing that,
//! `area:highway`) are treated as roads.  The tag value is trimmed and
//! lower-cased and becomes the line's road type.  Accepted geometries:
//!
//! | Geometry          | Lines emitted                      |
//! |-------------------|------------------------------------|
//! | `LineString`      | the line itself                    |
//! | `MultiLineString` | one per member line                |
//! | `Polygon`         | one per ring (rings are closed)    |
//! | `MultiPolygon`    | one per ring of every polygon      |
//!
//! Positions that are not at least two finite numbers are dropped
//! individually; the rest of the line is kept.  A collection with no
//! qualifying features yields an empty `Vec`, not an error.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use sa_core::GeoPoint;

use crate::{SpatialError, SpatialResult};

// ── Public types ──────────────────────────────────────────────────────────────

/// One ordered coordinate sequence taken from a road feature.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadLine {
    /// Normalised (`trim` + lower-case) `highway` tag value.
    pub road_type: String,
    /// Vertices in input order.
    pub coords: Vec<GeoPoint>,
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Read and parse a GeoJSON FeatureCollection from disk.
///
/// # Errors
///
/// [`SpatialError::SourceMissing`] if `path` does not exist,
/// [`SpatialError::Io`] / [`SpatialError::GeoJson`] if it cannot be read or is
/// not JSON at all.
pub fn read_road_lines(path: &Path) -> SpatialResult<Vec<RoadLine>> {
    if !path.exists() {
        return Err(SpatialError::SourceMissing(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let lines = read_road_lines_from(BufReader::new(file))?;
    if lines.is_empty() {
        warn!(path = %path.display(), "road geometry contains no highway features");
    }
    Ok(lines)
}

/// Like [`read_road_lines`] but accepts any `Read` source.
pub fn read_road_lines_from<R: Read>(reader: R) -> SpatialResult<Vec<RoadLine>> {
    let value: Value = serde_json::from_reader(reader)?;
    Ok(parse_road_lines(&value))
}

/// Extract road lines from an already-parsed GeoJSON value.
pub fn parse_road_lines(collection: &Value) -> Vec<RoadLine> {
    let Some(features) = collection.get("features").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut used = 0usize;
    for feature in features {
        let Some(road_type) = feature.get("properties").and_then(Value::as_object).and_then(road_type_of)
        else {
            continue;
        };
        let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) else {
            continue;
        };
        let before = lines.len();
        push_geometry_lines(geometry, &road_type, &mut lines);
        if lines.len() > before {
            used += 1;
        }
    }
    debug!(features = features.len(), used, lines = lines.len(), "parsed road geometry");
    lines
}

// ── Property helpers ──────────────────────────────────────────────────────────

fn road_type_of(props: &Map<String, Value>) -> Option<String> {
    props
        .get("highway")
        .and_then(normalize_road_type)
        .or_else(|| props.get("area:highway").and_then(normalize_road_type))
}

/// Lower-cased, trimmed tag value.  Lists contribute their first element.
fn normalize_road_type(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) => return items.first().and_then(normalize_road_type),
        Value::Bool(false) => return None,
        other => other.to_string(),
    };
    let norm = raw.trim().to_lowercase();
    (!norm.is_empty()).then_some(norm)
}

// ── Geometry helpers ──────────────────────────────────────────────────────────

fn push_geometry_lines(geometry: &Value, road_type: &str, out: &mut Vec<RoadLine>) {
    let Some(coords_value) = geometry.get("coordinates") else {
        return;
    };
    let Some(coords) = coords_value.as_array() else {
        return;
    };
    let mut push = |positions: &Value| {
        if let Some(line) = parse_line(positions, road_type) {
            out.push(line);
        }
    };
    match geometry.get("type").and_then(Value::as_str) {
        Some("LineString") => push(coords_value),
        Some("MultiLineString") | Some("Polygon") => coords.iter().for_each(push),
        Some("MultiPolygon") => coords
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .for_each(push),
        _ => {}
    }
}

fn parse_line(positions: &Value, road_type: &str) -> Option<RoadLine> {
    let coords: Vec<GeoPoint> = positions
        .as_array()?
        .iter()
        .filter_map(parse_position)
        .collect();
    (!coords.is_empty()).then(|| RoadLine { road_type: road_type.to_owned(), coords })
}

/// `[lon, lat, ...]` → `GeoPoint`.  Numeric strings are accepted.
fn parse_position(position: &Value) -> Option<GeoPoint> {
    let pos = position.as_array()?;
    if pos.len() < 2 {
        return None;
    }
    let lon = ordinate(&pos[0])?;
    let lat = ordinate(&pos[1])?;
    let p = GeoPoint::from_lon_lat(lon, lat);
    p.is_finite().then_some(p)
}

fn ordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
