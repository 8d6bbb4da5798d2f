//! Core error type.

use thiserror::Error;

/// Errors produced by `sa-core` validation helpers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid coordinate (lat {lat}, lon {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// Shorthand result type for `sa-core`.
pub type CoreResult<T> = Result<T, CoreError>;
