//! Spatial-subsystem error type.
//!
//! Only conditions that leave the caller without usable road data are
//! errors.  An unsnappable point or an unreachable node is an ordinary
//! `None`; a stale or corrupt cache is a silent rebuild.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `sa-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("road geometry file not found at {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON parse error: {0}")]
    GeoJson(#[from] serde_json::Error),

    #[error("cache encoding error: {0}")]
    Cache(#[from] bincode::Error),

    #[error("invalid network data: {0}")]
    InvalidNetwork(String),

    #[error("{0} capacity exceeded")]
    CapacityExceeded(&'static str),

    /// An earlier load of an unchanged source failed; not retried until the
    /// file changes.
    #[error("road network at {} failed to load earlier: {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
