//! Versioned on-disk network cache.
//!
//! # File layout (bincode)
//!
//! ```text
//! CacheHeader { schema_version: u32, tag_kind: String }
//! NetworkParts<T> { node_pos, edge_ends, edge_length_m, edge_tag,
//!                   node_tag_start, node_tags, road_types }
//! ```
//!
//! Adjacency and the spatial index are rebuilt on load; only the owned core
//! is stored.  Bump [`CACHE_SCHEMA_VERSION`] on any change to either struct.
//!
//! # Validity
//!
//! A cache is used only if its mtime is `>=` the source file's, its schema
//! version and tag kind match, and the decoded parts pass
//! [`NetworkParts::validate`].  Every other outcome is a [`CacheMiss`] and
//! leads to a rebuild that overwrites the file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use sa_core::{GeoPoint, NodeId};

use crate::geojson::read_road_lines;
use crate::network::{NetworkParts, RoadNetwork};
use crate::tags::{EdgeTag, RoadTypeRegistry};
use crate::{SpatialError, SpatialResult};

/// Current on-disk layout version.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Why a cache file was not used.
#[derive(Debug, Error, PartialEq)]
pub enum CacheMiss {
    #[error("no cache file")]
    Absent,

    #[error("cache is older than its source")]
    Stale,

    #[error("cache schema {found} does not match {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("cache holds a `{found}` network, expected `{expected}`")]
    KindMismatch { found: String, expected: &'static str },

    #[error("cache is unreadable: {0}")]
    Corrupt(String),
}

#[derive(Serialize, Deserialize)]
struct CacheHeader {
    schema_version: u32,
    tag_kind:       String,
}

/// Borrowed mirror of [`NetworkParts`]; field order and types must encode
/// identically.
#[derive(Serialize)]
struct PartsRef<'a, T> {
    node_pos:       &'a [GeoPoint],
    edge_ends:      &'a [[NodeId; 2]],
    edge_length_m:  &'a [f64],
    edge_tag:       &'a [T],
    node_tag_start: &'a [u32],
    node_tags:      &'a [T],
    road_types:     &'a RoadTypeRegistry,
}

/// Conventional cache location next to `source`, distinct per tag kind
/// (`Roadway.geojson` → `Roadway.plain.netcache`).
pub fn default_cache_path<T: EdgeTag>(source: &Path) -> PathBuf {
    source.with_extension(format!("{}.netcache", T::KIND))
}

fn modified(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// `true` when `cache` exists and is at least as new as `source`.
pub fn cache_is_fresh(cache: &Path, source: &Path) -> bool {
    match (modified(cache), modified(source)) {
        (Some(c), Some(s)) => c >= s,
        _ => false,
    }
}

/// Load a cached network built from `source`.
pub fn load_cache<T: EdgeTag>(cache: &Path, source: &Path) -> Result<RoadNetwork<T>, CacheMiss> {
    if !cache.exists() {
        return Err(CacheMiss::Absent);
    }
    if !cache_is_fresh(cache, source) {
        return Err(CacheMiss::Stale);
    }

    let file = File::open(cache).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let header: CacheHeader =
        bincode::deserialize_from(&mut reader).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;
    if header.schema_version != CACHE_SCHEMA_VERSION {
        return Err(CacheMiss::SchemaMismatch { found: header.schema_version, expected: CACHE_SCHEMA_VERSION });
    }
    if header.tag_kind != T::KIND {
        return Err(CacheMiss::KindMismatch { found: header.tag_kind, expected: T::KIND });
    }

    let parts: NetworkParts<T> =
        bincode::deserialize_from(&mut reader).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;
    RoadNetwork::from_parts(parts).map_err(|e| CacheMiss::Corrupt(e.to_string()))
}

/// Write `network` to `cache`.  The file is written beside its final name
/// and renamed into place, so readers never see a partial blob; on failure
/// the partial file is removed.
pub fn save_cache<T: EdgeTag>(network: &RoadNetwork<T>, cache: &Path) -> SpatialResult<()> {
    let mut tmp_name = cache.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = cache.with_file_name(tmp_name);

    let written = write_blob(network, &tmp).and_then(|()| fs::rename(&tmp, cache).map_err(SpatialError::from));
    if written.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %e, "failed to remove partial cache file");
        }
    }
    written
}

fn write_blob<T: EdgeTag>(network: &RoadNetwork<T>, path: &Path) -> SpatialResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let header = CacheHeader { schema_version: CACHE_SCHEMA_VERSION, tag_kind: T::KIND.to_owned() };
    bincode::serialize_into(&mut writer, &header)?;
    bincode::serialize_into(
        &mut writer,
        &PartsRef {
            node_pos:       &network.node_pos,
            edge_ends:      &network.edge_ends,
            edge_length_m:  &network.edge_length_m,
            edge_tag:       &network.edge_tag,
            node_tag_start: &network.node_tag_start,
            node_tags:      &network.node_tags,
            road_types:     &network.road_types,
        },
    )?;
    writer.flush()?;
    Ok(())
}

/// Load the network from `cache` when valid, otherwise parse `source`,
/// build, and (best effort) rewrite the cache.
///
/// # Errors
///
/// [`SpatialError::SourceMissing`] if `source` does not exist (even when a
/// cache file does); parse errors from the GeoJSON.  Cache problems are
/// never errors.
pub fn load_or_build<T: EdgeTag>(source: &Path, cache: Option<&Path>) -> SpatialResult<RoadNetwork<T>> {
    if !source.exists() {
        return Err(SpatialError::SourceMissing(source.to_path_buf()));
    }
    let t0 = Instant::now();

    if let Some(cache) = cache {
        match load_cache::<T>(cache, source) {
            Ok(network) => {
                info!(
                    cache = %cache.display(),
                    kind = T::KIND,
                    nodes = network.node_count(),
                    edges = network.edge_count(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "loaded road network from cache"
                );
                return Ok(network);
            }
            Err(miss @ CacheMiss::Corrupt(_)) => {
                warn!(cache = %cache.display(), reason = %miss, "discarding road network cache");
            }
            Err(miss) => {
                debug!(cache = %cache.display(), reason = %miss, "road network cache miss");
            }
        }
    }

    let lines = read_road_lines(source)?;
    let network = RoadNetwork::<T>::from_road_lines(&lines)?;
    if network.is_empty() {
        warn!(source = %source.display(), "road network is empty; network distances are unavailable");
    }

    if let Some(cache) = cache {
        if let Err(e) = save_cache(&network, cache) {
            warn!(cache = %cache.display(), error = %e, "failed to write road network cache");
        }
    }

    info!(
        source = %source.display(),
        kind = T::KIND,
        lines = lines.len(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "built road network"
    );
    Ok(network)
}
