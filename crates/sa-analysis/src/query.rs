//! Per-call query parameters.

use sa_core::GeoPoint;

use crate::weight::normalize_radii;
use crate::{AnalysisError, AnalysisResult, DistanceMode};

/// One aggregation request.  Build with [`AnalysisConfig::query`](crate::AnalysisConfig::query)
/// and adjust with the setters.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisQuery {
    pub center:          GeoPoint,
    pub radii_km:        Vec<f64>,
    pub decay_scale_km:  f64,
    pub include_network: bool,
    pub mode:            DistanceMode,
    /// `None` means every configured category.
    pub categories:      Option<Vec<String>>,
    /// Nearby list length per category (at least 1).
    pub limit:           usize,
}

impl AnalysisQuery {
    pub fn radii(mut self, radii_km: impl Into<Vec<f64>>) -> Self {
        self.radii_km = radii_km.into();
        self
    }

    pub fn radius(self, radius_km: f64) -> Self {
        self.radii(vec![radius_km])
    }

    pub fn decay_scale_km(mut self, decay_scale_km: f64) -> Self {
        self.decay_scale_km = decay_scale_km;
        self
    }

    pub fn include_network(mut self, include: bool) -> Self {
        self.include_network = include;
        self
    }

    pub fn mode(mut self, mode: DistanceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Normalised radii (see [`normalize_radii`]).
    pub fn normalized_radii(&self) -> Vec<f64> {
        normalize_radii(&self.radii_km)
    }

    pub fn max_radius_km(&self) -> f64 {
        self.normalized_radii().last().copied().unwrap_or(1.0)
    }

    pub(crate) fn validate(&self) -> AnalysisResult<()> {
        if !self.center.is_valid() {
            return Err(AnalysisError::InvalidParameter(format!("center {} is not a valid coordinate", self.center)));
        }
        if self.decay_scale_km.is_nan() {
            return Err(AnalysisError::InvalidParameter("decay_scale_km is NaN".to_owned()));
        }
        Ok(())
    }
}
