//! `sa-poi` — point-of-interest datasets.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`record`]  | `PoiRecord`                                               |
//! | [`schema`]  | `PoiSchema`: header-driven column detection               |
//! | [`loader`]  | `load_pois_csv`, `load_pois_reader`                       |
//! | [`catalog`] | `PoiCatalog`: category → file resolution and mtime cache  |
//! | [`error`]   | `PoiError`, `PoiResult<T>`                                |
//!
//! Datasets are plain CSV files, one per category.  Column names vary between
//! exports, so the schema is detected once per file from its header row
//! rather than looked up per row.

pub mod catalog;
pub mod error;
pub mod loader;
pub mod record;
pub mod schema;


pub use catalog::{DEFAULT_POI_FILES, POI_DIR_ENV, PoiCatalog, find_category_file, resolve_poi_dir};
pub use error::{PoiError, PoiResult};
pub use loader::{load_pois_csv, load_pois_reader};
pub use record::PoiRecord;
pub use schema::PoiSchema;
