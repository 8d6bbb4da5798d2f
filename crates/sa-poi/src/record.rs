use serde::Serialize;

use sa_core::GeoPoint;

/// One point of interest from a category dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoiRecord {
    pub category:    String,
    pub name:        Option<String>,
    pub pos:         GeoPoint,
    pub subcategory: Option<String>,
    /// Importance from a `weight`/`importance` column, when the dataset
    /// carries one.  Aggregations weight POIs by distance decay only; this
    /// value is reported alongside (see `NearbyPoi::importance`) for the
    /// scoring layer to use.
    pub weight:      Option<f64>,
}
