use serde::Serialize;

use sa_core::GeoPoint;
use sa_spatial::AccessibilityResult;

/// Road accessibility record for one location.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoadAccessibilityReport {
    pub center:         GeoPoint,
    pub radius_km:      f64,
    pub decay_scale_km: f64,
    #[serde(flatten)]
    pub result:         AccessibilityResult,
}
