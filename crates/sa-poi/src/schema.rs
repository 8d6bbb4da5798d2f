//! Column detection for POI CSV files.
//!
//! Header names are matched case-insensitively after trimming:
//!
//! | Field         | Accepted headers                          |
//! |---------------|-------------------------------------------|
//! | latitude      | `lat`, `latitude`, `y`                    |
//! | longitude     | `lon`, `lng`, `longitude`, `x`            |
//! | name          | `name`, `title`                           |
//! | subcategory   | `subcategory`, `sub_category`, `type`     |
//! | importance    | `weight`, `importance`                    |
//!
//! When either coordinate header is missing, the first two numeric columns
//! are taken as latitude and longitude, in that order.

use csv::StringRecord;

const LAT_HEADERS: &[&str] = &["lat", "latitude", "y"];
const LON_HEADERS: &[&str] = &["lon", "lng", "longitude", "x"];
const NAME_HEADERS: &[&str] = &["name", "title"];
const SUBCATEGORY_HEADERS: &[&str] = &["subcategory", "sub_category", "type"];
const IMPORTANCE_HEADERS: &[&str] = &["weight", "importance"];

/// Column indices of one dataset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoiSchema {
    pub lat:         usize,
    pub lon:         usize,
    pub name:        Option<usize>,
    pub subcategory: Option<usize>,
    pub importance:  Option<usize>,
}

fn find(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

/// A column is numeric when it has at least one non-blank value and every
/// non-blank value parses as a number.
fn is_numeric_column(rows: &[StringRecord], col: usize) -> bool {
    let mut seen = false;
    for row in rows {
        let cell = row.get(col).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        if cell.parse::<f64>().is_err() {
            return false;
        }
        seen = true;
    }
    seen
}

impl PoiSchema {
    /// Detect columns from the header and the parsed rows.
    ///
    /// Returns the reason as `Err` when no coordinate pair can be found.
    pub fn detect(headers: &StringRecord, rows: &[StringRecord]) -> Result<Self, String> {
        let (lat, lon) = match (find(headers, LAT_HEADERS), find(headers, LON_HEADERS)) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                let mut numeric = (0..headers.len()).filter(|&c| is_numeric_column(rows, c));
                match (numeric.next(), numeric.next()) {
                    (Some(lat), Some(lon)) => (lat, lon),
                    _ => {
                        return Err(format!(
                            "no latitude/longitude headers and fewer than two numeric columns in [{}]",
                            headers.iter().collect::<Vec<_>>().join(", ")
                        ));
                    }
                }
            }
        };
        Ok(Self {
            lat,
            lon,
            name:        find(headers, NAME_HEADERS),
            subcategory: find(headers, SUBCATEGORY_HEADERS),
            importance:  find(headers, IMPORTANCE_HEADERS),
        })
    }
}
