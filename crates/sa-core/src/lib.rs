//! `sa-core` — foundational types for the site accessibility engine.
//!
//! This crate is a dependency of every other `sa-*` crate.  It intentionally
//! has no `sa-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                |
//! |-----------|---------------------------------------------------------|
//! | [`ids`]   | `NodeId`, `EdgeId`, `RoadTypeId`                        |
//! | [`geo`]   | `GeoPoint`, haversine distance, coordinate validation   |
//! | [`error`] | `CoreError`, `CoreResult`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by the on-disk network cache in `sa-spatial`.     |

pub mod error;
pub mod geo;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{EARTH_RADIUS_M, GeoPoint};
pub use ids::{EdgeId, NodeId, RoadTypeId};
