//! Decay weighting and radius handling.

/// Decimal places radii are rounded to before deduplication.
const RADIUS_DECIMALS: i32 = 6;

/// `max(0, 1 − d/r) · exp(−d/k)`.
///
/// Zero for a non-positive radius.  A non-positive decay scale disables the
/// exponential term and leaves the linear falloff.
pub fn decay_weight(distance_km: f64, radius_km: f64, decay_scale_km: f64) -> f64 {
    if !(radius_km > 0.0) {
        return 0.0;
    }
    let base = (1.0 - distance_km / radius_km).max(0.0);
    if decay_scale_km > 0.0 && decay_scale_km.is_finite() {
        base * (-distance_km / decay_scale_km).exp()
    } else {
        base
    }
}

/// Positive, finite, deduplicated, ascending.  Falls back to `[1.0]`.
pub fn normalize_radii(radii_km: &[f64]) -> Vec<f64> {
    let scale = 10f64.powi(RADIUS_DECIMALS);
    let mut out: Vec<f64> = radii_km
        .iter()
        .copied()
        .filter(|r| r.is_finite() && *r > 0.0)
        .map(|r| (r * scale).round() / scale)
        .filter(|r| *r > 0.0)
        .collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    if out.is_empty() {
        out.push(1.0);
    }
    out
}

/// `π r²`.
pub fn circle_area_sqkm(radius_km: f64) -> f64 {
    std::f64::consts::PI * radius_km * radius_km
}
