use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot detect POI columns in {}: {reason}", path.display())]
    Schema { path: PathBuf, reason: String },

    #[error("unknown POI category `{0}`")]
    UnknownCategory(String),

    #[error("POI data directory not found (tried {})", display_paths(.tried))]
    DataDirMissing { tried: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

pub type PoiResult<T> = Result<T, PoiError>;
