//! Edge tag payloads and the road-type registry.
//!
//! The graph is generic over an [`EdgeTag`]:
//!
//! | Tag          | Edge payload           | Node payload              |
//! |--------------|------------------------|---------------------------|
//! | `()`         | none                   | none                      |
//! | `RoadTypeId` | category of the edge   | every category touching it |
//!
//! Road categories are interned into a [`RoadTypeRegistry`] owned by the
//! network so hot loops compare `u16`s instead of strings.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sa_core::RoadTypeId;

use crate::{SpatialError, SpatialResult};

// ── EdgeTag ───────────────────────────────────────────────────────────────────

/// Per-edge payload carried by a [`RoadNetwork`](crate::RoadNetwork).
pub trait EdgeTag:
    Copy + Ord + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Identifies the variant inside cache files so a plain cache is never
    /// decoded as a typed one (or vice versa).
    const KIND: &'static str;

    /// Whether endpoint nodes collect the tags of the edges touching them.
    const TAGS_NODES: bool;

    /// Turn a normalised road category into a tag, interning it if needed.
    fn intern(road_type: &str, registry: &mut RoadTypeRegistry) -> SpatialResult<Self>;
}

impl EdgeTag for () {
    const KIND: &'static str = "plain";
    const TAGS_NODES: bool = false;

    #[inline]
    fn intern(_road_type: &str, _registry: &mut RoadTypeRegistry) -> SpatialResult<Self> {
        Ok(())
    }
}

impl EdgeTag for RoadTypeId {
    const KIND: &'static str = "road_type";
    const TAGS_NODES: bool = true;

    fn intern(road_type: &str, registry: &mut RoadTypeRegistry) -> SpatialResult<Self> {
        registry.intern(road_type)
    }
}

// ── RoadTypeRegistry ──────────────────────────────────────────────────────────

/// Dense `RoadTypeId` → name table.
///
/// Extracts carry a few dozen categories, so lookup by name is a linear scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadTypeRegistry {
    names: Vec<String>,
}

impl RoadTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, allocating the next one if unseen.
    pub fn intern(&mut self, name: &str) -> SpatialResult<RoadTypeId> {
        if let Some(id) = self.id_of(name) {
            return Ok(id);
        }
        let id = RoadTypeId::try_from(self.names.len())
            .ok()
            .filter(|id| *id != RoadTypeId::INVALID)
            .ok_or(SpatialError::CapacityExceeded("road type"))?;
        self.names.push(name.to_owned());
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<RoadTypeId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| RoadTypeId(i as u16))
    }

    /// Name of an interned id.  Unknown ids yield `""`.
    pub fn name(&self, id: RoadTypeId) -> &str {
        self.names.get(id.index()).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (RoadTypeId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (RoadTypeId(i as u16), n.as_str()))
    }
}
