//! Build-once network handle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::network::RoadNetwork;
use crate::paths::DEFAULT_PATH_CACHE_CAPACITY;
use crate::persist::load_or_build;
use crate::tags::EdgeTag;
use crate::{SpatialError, SpatialResult};

/// Last failed load: the source's mtime at the time (`None` if absent) and
/// the error text.
struct FailedLoad {
    mtime:  Option<SystemTime>,
    reason: String,
}

/// Loads a [`RoadNetwork`] on first use and hands out shared references.
///
/// Concurrent first callers block on a single load; nobody parses the
/// GeoJSON twice.  A failed load is remembered together with the source's
/// modification time: later calls return [`SpatialError::LoadFailed`]
/// without touching the file until it appears or changes.
pub struct LazyNetwork<T: EdgeTag = ()> {
    source:              PathBuf,
    cache:               Option<PathBuf>,
    path_cache_capacity: usize,
    cell:                OnceCell<Arc<RoadNetwork<T>>>,
    failed:              Mutex<Option<FailedLoad>>,
}

fn source_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl<T: EdgeTag> LazyNetwork<T> {
    pub fn new(source: impl Into<PathBuf>, cache: Option<PathBuf>) -> Self {
        Self {
            source: source.into(),
            cache,
            path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY,
            cell: OnceCell::new(),
            failed: Mutex::new(None),
        }
    }

    pub fn with_path_cache_capacity(mut self, capacity: usize) -> Self {
        self.path_cache_capacity = capacity;
        self
    }

    /// The loaded network, loading it now if needed.
    pub fn get(&self) -> SpatialResult<Arc<RoadNetwork<T>>> {
        if let Some(network) = self.cell.get() {
            return Ok(Arc::clone(network));
        }

        let mtime = source_mtime(&self.source);
        if let Some(failed) = self.failed.lock().as_ref().filter(|f| f.mtime == mtime) {
            return Err(SpatialError::LoadFailed { path: self.source.clone(), reason: failed.reason.clone() });
        }

        let loaded = self.cell.get_or_try_init(|| -> SpatialResult<_> {
            let network = load_or_build::<T>(&self.source, self.cache.as_deref())?
                .with_path_cache_capacity(self.path_cache_capacity);
            Ok(Arc::new(network))
        });
        match loaded {
            Ok(network) => {
                *self.failed.lock() = None;
                Ok(Arc::clone(network))
            }
            Err(e) => {
                *self.failed.lock() = Some(FailedLoad { mtime, reason: e.to_string() });
                Err(e)
            }
        }
    }

    /// Already-loaded network, without triggering a load.
    pub fn get_loaded(&self) -> Option<Arc<RoadNetwork<T>>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}
