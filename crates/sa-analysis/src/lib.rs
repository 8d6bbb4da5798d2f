//! `sa-analysis` — location aggregation over roads and POIs.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`config`]      | `AnalysisConfig` (JSON, defaults, validation)              |
//! | [`query`]       | `AnalysisQuery` per-call parameters                        |
//! | [`mode`]        | `DistanceMode`: auto / haversine / network                 |
//! | [`weight`]      | `decay_weight`, `normalize_radii`                          |
//! | [`distance`]    | Per-POI haversine + bounded network distances              |
//! | [`rings`]       | `RingSummary`, `summarize_rings`                           |
//! | [`nearby`]      | `NearbyPoi`, ranked listing                                |
//! | [`competition`] | `CompetitionIndex`                                         |
//! | [`composite`]   | `CompositeIndex`, `FeaturePayload`                         |
//! | [`report`]      | `RoadAccessibilityReport`                                  |
//! | [`service`]     | `SiteAnalysis`: lazy graphs + catalog + every operation    |
//! | [`error`]       | `AnalysisError`, `AnalysisResult<T>`                       |

pub mod competition;
pub mod composite;
pub mod config;
pub mod distance;
pub mod error;
pub mod mode;
pub mod nearby;
pub mod query;
pub mod report;
pub mod rings;
pub mod service;
pub mod weight;


pub use competition::CompetitionIndex;
pub use composite::{CompositeIndex, FeaturePayload, radius_label};
pub use config::AnalysisConfig;
pub use distance::{CategoryDistances, PoiDistance, measure_category, network_distances_m};
pub use error::{AnalysisError, AnalysisResult};
pub use mode::DistanceMode;
pub use nearby::{NearbyPoi, nearby_list};
pub use query::AnalysisQuery;
pub use report::RoadAccessibilityReport;
pub use rings::{CategoryRing, Ring, RingSummary, RingTotals, summarize_rings};
pub use service::SiteAnalysis;
pub use weight::{circle_area_sqkm, decay_weight, normalize_radii};
