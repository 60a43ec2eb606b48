//! One-shot and continuous render jobs.
//!
//! Jobs compose the scan pipeline into user-facing operations:
//!
//! * [`FullRenderJob`] renders every known region, resumable across
//!   restarts via the scan ledger.
//! * [`RadiusRenderJob`] renders the regions around a point, e.g. a
//!   player's surroundings after a teleport.
//! * [`BackgroundRenderJob`] runs the region processor's continuous
//!   cycle as a pausable job.
//!
//! All jobs share the same control surface: cooperative cancellation
//! (in-flight regions finish, nothing new starts) and pull-based
//! progress.

mod background;
mod full;
mod progress;
mod radius;

pub use background::BackgroundRenderJob;
pub use full::FullRenderJob;
pub use progress::{Progress, ProgressReport};
pub use radius::RadiusRenderJob;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::scan::ScanControl;
use crate::state::StateError;
use crate::tile::TileError;
use crate::world::WorldError;

/// Errors that abort a job before or during its run.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Tile(#[from] TileError),
}

/// Cancellation handle shared between a job and its caller.
///
/// A normal cancel is a user action: the job logs what it finished and
/// cleans up its resume state. A forced cancel means the world is
/// going away underneath us (unload, shutdown); the job stays silent
/// and keeps resume state so the work can continue next run.
#[derive(Debug, Clone)]
pub struct JobControl {
    scan: ScanControl,
    forced: Arc<AtomicBool>,
}

impl JobControl {
    pub fn new() -> Self {
        Self {
            scan: ScanControl::new(),
            forced: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. In-flight regions run to completion.
    pub fn cancel(&self, forced: bool) {
        if forced {
            self.forced.store(true, Ordering::Release);
        }
        self.scan.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.scan.is_cancelled()
    }

    pub fn was_forced(&self) -> bool {
        self.forced.load(Ordering::Acquire)
    }

    pub(crate) fn scan_control(&self) -> &ScanControl {
        &self.scan
    }
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}

/// What a finished (or cancelled) job accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub rendered: usize,
    pub failed: usize,
    pub cancelled: bool,
}
