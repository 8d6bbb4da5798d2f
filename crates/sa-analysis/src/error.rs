use thiserror::Error;

use sa_poi::PoiError;
use sa_spatial::SpatialError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Poi(#[from] PoiError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
