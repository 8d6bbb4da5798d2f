//! Category → dataset resolution with an in-memory cache.
//!
//! # Directory resolution
//!
//! [`resolve_poi_dir`] tries, in order: an explicit override (normally the
//! `SITEX_POI_DATA_DIR` environment variable), `Data/CSV_Reference/final`,
//! then `Data/CSV` under the data root.
//!
//! # File resolution
//!
//! Each category maps to an expected file name.  If that file is absent the
//! directory's `*.csv` files are scanned (in name order) for one whose name
//! contains the category stem or its singular (`banks` → `bank_list.csv`).
//!
//! # Cache
//!
//! Parsed datasets are kept per resolved path together with the file's
//! modification time, and reloaded once the file on disk is newer.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::loader::load_pois_csv;
use crate::record::PoiRecord;
use crate::{PoiError, PoiResult};

/// Environment variable that overrides the POI directory.
pub const POI_DIR_ENV: &str = "SITEX_POI_DATA_DIR";

/// Category → expected file name.
pub const DEFAULT_POI_FILES: &[(&str, &str)] = &[
    ("cafes", "cafe_final.csv"),
    ("banks", "banks_final.csv"),
    ("education", "education_final.csv"),
    ("health", "health_final.csv"),
    ("temples", "temples_final.csv"),
    ("other", "other_final.csv"),
];

// ── Resolution helpers ────────────────────────────────────────────────────────

/// Locate the POI directory under `data_root`, preferring `override_dir`
/// when it exists.
pub fn resolve_poi_dir(data_root: &Path, override_dir: Option<&Path>) -> PoiResult<PathBuf> {
    let mut tried = Vec::with_capacity(3);
    let candidates = override_dir
        .map(Path::to_path_buf)
        .into_iter()
        .chain([
            data_root.join("Data").join("CSV_Reference").join("final"),
            data_root.join("Data").join("CSV"),
        ]);
    for dir in candidates {
        if dir.is_dir() {
            return Ok(dir);
        }
        tried.push(dir);
    }
    Err(PoiError::DataDirMissing { tried })
}

/// Name fragments a fuzzy match accepts for `expected` (`banks_final.csv`
/// → `banks_final`, `banks`, `bank`).
fn match_keys(expected: &str) -> Vec<String> {
    let stem = expected.to_lowercase();
    let stem = stem.strip_suffix(".csv").unwrap_or(&stem).to_owned();
    let core = stem.strip_suffix("_final").unwrap_or(&stem).to_owned();
    let mut keys = vec![stem.clone()];
    if core != stem {
        keys.push(core.clone());
    }
    if let Some(s) = core.strip_suffix("es").filter(|s| !s.is_empty()) {
        keys.push(s.to_owned());
    }
    if let Some(s) = core.strip_suffix('s').filter(|s| !s.is_empty()) {
        keys.push(s.to_owned());
    }
    keys
}

/// `dir/expected` if present, else the first `*.csv` in `dir` whose name
/// contains one of the category's name fragments.
pub fn find_category_file(dir: &Path, expected: &str) -> Option<PathBuf> {
    let exact = dir.join(expected);
    if exact.is_file() {
        return Some(exact);
    }

    let mut csvs: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    csvs.sort();

    let keys = match_keys(expected);
    csvs.into_iter().find(|p| {
        let name = p.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
        keys.iter().any(|k| name.contains(k.as_str()))
    })
}

// ── PoiCatalog ────────────────────────────────────────────────────────────────

struct CachedPois {
    mtime: SystemTime,
    pois:  Arc<[PoiRecord]>,
}

/// Per-category POI datasets from one directory.
///
/// `Send + Sync`; concurrent readers share cached datasets.
pub struct PoiCatalog {
    dir:   PathBuf,
    files: Vec<(String, String)>,
    cache: RwLock<FxHashMap<PathBuf, CachedPois>>,
}

impl PoiCatalog {
    /// Catalog over `dir` with an explicit category → file name table.  The
    /// table order is the category order reported by [`categories`](Self::categories).
    pub fn new<I, K, V>(dir: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dir:   dir.into(),
            files: files.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Catalog over `dir` with [`DEFAULT_POI_FILES`].
    pub fn with_default_files(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, DEFAULT_POI_FILES.iter().copied())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Configured category names in table order.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.iter().map(|(c, _)| c.as_str())
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.files.iter().any(|(c, _)| c == category)
    }

    /// Resolved dataset path for `category`, if a file can be found.
    pub fn path_for(&self, category: &str) -> PoiResult<Option<PathBuf>> {
        let expected = self
            .files
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, f)| f.as_str())
            .ok_or_else(|| PoiError::UnknownCategory(category.to_owned()))?;
        Ok(find_category_file(&self.dir, expected))
    }

    /// All POIs of `category`.
    ///
    /// A configured category whose file cannot be found yields an empty set
    /// (with a warning); an unconfigured one is an error.
    pub fn load(&self, category: &str) -> PoiResult<Arc<[PoiRecord]>> {
        let Some(path) = self.path_for(category)? else {
            warn!(dir = %self.dir.display(), category, "no POI file for category");
            return Ok(Arc::from(Vec::new()));
        };

        let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok();
        if let Some(mtime) = mtime {
            if let Some(hit) = self.cache.read().get(&path).filter(|c| c.mtime >= mtime) {
                debug!(path = %path.display(), category, "POI cache hit");
                return Ok(Arc::clone(&hit.pois));
            }
        }

        let pois: Arc<[PoiRecord]> = load_pois_csv(&path, category)?.into();
        if let Some(mtime) = mtime {
            self.cache.write().insert(path, CachedPois { mtime, pois: Arc::clone(&pois) });
        }
        Ok(pois)
    }

    /// Number of datasets currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}
