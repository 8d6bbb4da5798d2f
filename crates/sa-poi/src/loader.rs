//! CSV POI loader.
//!
//! # CSV format
//!
//! Any header layout [`PoiSchema::detect`] understands, e.g.
//!
//! ```csv
//! name,latitude,longitude,subcategory
//! Himalayan Java,27.7172,85.3240,coffee_shop
//! Bakery Cafe,27.7101,85.3175,
//! ```
//!
//! Rows whose coordinates are blank, non-numeric or out of range are
//! dropped and counted; the rest of the file still loads.  Blank name and
//! subcategory cells become `None`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use sa_core::GeoPoint;

use crate::record::PoiRecord;
use crate::schema::PoiSchema;
use crate::{PoiError, PoiResult};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load every valid POI of `category` from the CSV at `path`.
pub fn load_pois_csv(path: &Path, category: &str) -> PoiResult<Vec<PoiRecord>> {
    let file = File::open(path)?;
    load_pois_reader(BufReader::new(file), category, path)
}

/// Like [`load_pois_csv`] but accepts any `Read` source.  `origin` is only
/// used in errors and log fields.
pub fn load_pois_reader<R: Read>(reader: R, category: &str, origin: &Path) -> PoiResult<Vec<PoiRecord>> {
    // ── Parse CSV rows ────────────────────────────────────────────────────
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let rows: Vec<StringRecord> = csv_reader.records().collect::<Result<_, _>>()?;

    if rows.is_empty() {
        debug!(path = %origin.display(), category, "POI file has no rows");
        return Ok(Vec::new());
    }

    let schema = PoiSchema::detect(&headers, &rows)
        .map_err(|reason| PoiError::Schema { path: origin.to_path_buf(), reason })?;

    // ── Convert rows ──────────────────────────────────────────────────────
    let mut pois = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    for row in &rows {
        match to_record(row, &schema, category) {
            Some(poi) => pois.push(poi),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(path = %origin.display(), category, dropped, kept = pois.len(), "dropped POI rows with invalid coordinates");
    }
    debug!(path = %origin.display(), category, count = pois.len(), ?schema, "loaded POIs");
    Ok(pois)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn cell(row: &StringRecord, col: Option<usize>) -> Option<&str> {
    col.and_then(|c| row.get(c)).map(str::trim).filter(|s| !s.is_empty())
}

fn number(row: &StringRecord, col: usize) -> Option<f64> {
    cell(row, Some(col))?.parse().ok()
}

fn to_record(row: &StringRecord, schema: &PoiSchema, category: &str) -> Option<PoiRecord> {
    let pos = GeoPoint::try_new(number(row, schema.lat)?, number(row, schema.lon)?).ok()?;
    Some(PoiRecord {
        category:    category.to_owned(),
        name:        cell(row, schema.name).map(str::to_owned),
        pos,
        subcategory: cell(row, schema.subcategory).map(str::to_owned),
        weight:      schema.importance.and_then(|c| number(row, c)).filter(|w| w.is_finite()),
    })
}
