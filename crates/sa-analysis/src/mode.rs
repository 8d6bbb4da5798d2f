//! Distance selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Which distance a query ranks and weights POIs by.
///
/// | Mode        | Network usable                       | Network unusable |
/// |-------------|--------------------------------------|------------------|
/// | `Auto`      | network if routed, else haversine    | haversine        |
/// | `Haversine` | haversine                            | haversine        |
/// | `Network`   | network if routed, else haversine    | haversine        |
///
/// "Unusable" means the caller disabled the network or no non-empty road
/// graph could be loaded; the whole query then runs on one metric.  No mode
/// ever drops a POI: an unrouted one is measured by haversine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    #[default]
    Auto,
    Haversine,
    Network,
}

impl DistanceMode {
    /// The distance to rank and weight one POI by.
    pub fn choose(self, haversine_km: f64, network_km: Option<f64>, network_usable: bool) -> f64 {
        match self {
            _ if !network_usable => haversine_km,
            DistanceMode::Haversine => haversine_km,
            DistanceMode::Auto | DistanceMode::Network => network_km.unwrap_or(haversine_km),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMode::Auto => "auto",
            DistanceMode::Haversine => "haversine",
            DistanceMode::Network => "network",
        }
    }
}

impl fmt::Display for DistanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DistanceMode::Auto),
            "haversine" => Ok(DistanceMode::Haversine),
            "network" => Ok(DistanceMode::Network),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown distance mode {other:?}: expected auto, haversine or network"
            ))),
        }
    }
}
