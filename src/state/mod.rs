//! Persistent pipeline state.
//!
//! Two small JSON documents live under the state directory:
//!
//! * `timestamps.json` records, per region, when it was last rendered
//!   successfully. The processor compares these against world file
//!   mtimes to pick up changes made while the pipeline was not
//!   running.
//! * `full_scan.json` is the ledger of an in-progress full render. It
//!   survives a crash or forced shutdown so the job can resume from
//!   where it left off instead of starting over.
//!
//! Both files carry a version field and are written atomically via a
//! temp file and rename.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coord::RegionCoord;

/// On-disk format version for both state documents.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Filename of the per-region timestamp table.
pub const TIMESTAMPS_FILE: &str = "timestamps.json";

/// Filename of the full-render resume ledger.
pub const LEDGER_FILE: &str = "full_scan.json";

/// Errors from loading or saving pipeline state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("state serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unsupported state format version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed region key `{0}`")]
    BadKey(String),
}

fn region_key(region: RegionCoord) -> String {
    format!("{},{}", region.x, region.z)
}

fn parse_region_key(key: &str) -> Result<RegionCoord, StateError> {
    let (x, z) = key
        .split_once(',')
        .ok_or_else(|| StateError::BadKey(key.to_string()))?;
    let x = x
        .parse::<i32>()
        .map_err(|_| StateError::BadKey(key.to_string()))?;
    let z = z
        .parse::<i32>()
        .map_err(|_| StateError::BadKey(key.to_string()))?;
    Ok(RegionCoord::new(x, z))
}

/// Write `contents` to `path` via a temp file in the same directory.
///
/// Readers never observe a partially written document.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[derive(Serialize, Deserialize)]
struct TimestampsDoc {
    version: u32,
    regions: BTreeMap<String, u64>,
}

/// Per-region record of the last successful render, in milliseconds
/// since the Unix epoch.
///
/// Concurrent scan tasks record completions through a shared handle;
/// the processor persists the table once per cycle rather than per
/// region.
#[derive(Debug)]
pub struct RegionTimestamps {
    path: PathBuf,
    regions: DashMap<RegionCoord, u64>,
}

impl RegionTimestamps {
    /// Load the table from `state_dir`, or start empty if no file
    /// exists yet.
    pub fn load_or_default(state_dir: &Path) -> Result<Self, StateError> {
        let path = state_dir.join(TIMESTAMPS_FILE);
        let regions = DashMap::new();
        match fs::read(&path) {
            Ok(bytes) => {
                let doc: TimestampsDoc = serde_json::from_slice(&bytes)?;
                if doc.version != STATE_FORMAT_VERSION {
                    return Err(StateError::UnsupportedVersion(doc.version));
                }
                for (key, millis) in doc.regions {
                    regions.insert(parse_region_key(&key)?, millis);
                }
                debug!(path = %path.display(), regions = regions.len(), "loaded region timestamps");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no timestamp table yet, starting empty");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Self { path, regions })
    }

    /// When `region` last rendered successfully, if ever.
    pub fn last_processed(&self, region: RegionCoord) -> Option<SystemTime> {
        self.regions
            .get(&region)
            .map(|millis| UNIX_EPOCH + Duration::from_millis(*millis))
    }

    /// Record a successful render of `region`, stamped `at`.
    ///
    /// Callers pass the time the enclosing cycle or job started, not
    /// the completion time: an edit that lands while the region is
    /// rendering then still compares newer than the stamp, and the
    /// next mtime sweep picks it up.
    pub fn record(&self, region: RegionCoord, at: SystemTime) {
        let millis = at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64;
        self.regions.insert(region, millis);
    }

    /// Number of regions with a recorded render.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Persist the table atomically.
    pub fn save(&self) -> Result<(), StateError> {
        let mut doc = TimestampsDoc {
            version: STATE_FORMAT_VERSION,
            regions: BTreeMap::new(),
        };
        for entry in self.regions.iter() {
            doc.regions.insert(region_key(*entry.key()), *entry.value());
        }
        let bytes = serde_json::to_vec_pretty(&doc)?;
        atomic_write(&self.path, &bytes)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LedgerDoc {
    version: u32,
    regions: Vec<LedgerEntry>,
}

#[derive(Serialize, Deserialize)]
struct LedgerEntry {
    region: String,
    done: bool,
}

/// Resume ledger for a full render.
///
/// The region list is recorded in render order at job start, so a
/// resumed job continues in the same spiral sequence the original run
/// used.
#[derive(Debug)]
pub struct ScanLedger {
    path: PathBuf,
    regions: Vec<(RegionCoord, bool)>,
}

impl ScanLedger {
    /// Start a fresh ledger covering `regions`, in order, all pending.
    pub fn create(state_dir: &Path, regions: Vec<RegionCoord>) -> Self {
        Self {
            path: state_dir.join(LEDGER_FILE),
            regions: regions.into_iter().map(|r| (r, false)).collect(),
        }
    }

    /// Load an existing ledger, if one was left behind by an
    /// interrupted run.
    pub fn load(state_dir: &Path) -> Result<Option<Self>, StateError> {
        let path = state_dir.join(LEDGER_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc: LedgerDoc = serde_json::from_slice(&bytes)?;
        if doc.version != STATE_FORMAT_VERSION {
            return Err(StateError::UnsupportedVersion(doc.version));
        }
        let mut regions = Vec::with_capacity(doc.regions.len());
        for entry in doc.regions {
            regions.push((parse_region_key(&entry.region)?, entry.done));
        }
        debug!(
            path = %path.display(),
            total = regions.len(),
            done = regions.iter().filter(|(_, d)| *d).count(),
            "resuming from scan ledger"
        );
        Ok(Some(Self { path, regions }))
    }

    /// Regions not yet marked done, in render order.
    pub fn pending(&self) -> Vec<RegionCoord> {
        self.regions
            .iter()
            .filter(|(_, done)| !done)
            .map(|(r, _)| *r)
            .collect()
    }

    /// Total regions the ledger covers.
    pub fn total(&self) -> usize {
        self.regions.len()
    }

    /// Regions already marked done.
    pub fn completed(&self) -> usize {
        self.regions.iter().filter(|(_, done)| *done).count()
    }

    /// Mark `region` complete.
    pub fn mark_done(&mut self, region: RegionCoord) {
        if let Some(entry) = self.regions.iter_mut().find(|(r, _)| *r == region) {
            entry.1 = true;
        }
    }

    /// True once every region is marked done.
    pub fn is_complete(&self) -> bool {
        self.regions.iter().all(|(_, done)| *done)
    }

    /// Persist the ledger atomically.
    pub fn save(&self) -> Result<(), StateError> {
        let doc = LedgerDoc {
            version: STATE_FORMAT_VERSION,
            regions: self
                .regions
                .iter()
                .map(|(r, done)| LedgerEntry {
                    region: region_key(*r),
                    done: *done,
                })
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&doc)?;
        atomic_write(&self.path, &bytes)?;
        Ok(())
    }

    /// Delete the ledger file. Called when the job finishes or is
    /// cancelled normally.
    pub fn remove(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove scan ledger");
                Err(e.into())
            }
        }
    }
}
