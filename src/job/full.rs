//! Full-world render with crash-safe resume.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::{info, instrument, warn};

use crate::config::RenderConfig;
use crate::coord::REGION_CHUNKS;
use crate::processor::{run_batch, spiral_order, BatchContext, WorkerPools};
use crate::render::RendererSet;
use crate::state::{RegionTimestamps, ScanLedger};
use crate::tile::TilePyramidWriter;
use crate::world::WorldSource;

use super::{JobControl, JobError, JobSummary, Progress};

/// Renders every region the world knows about, nearest to the origin
/// first.
///
/// Progress through the region list is journaled in the scan ledger.
/// If the process dies mid-render, the next run picks up the pending
/// entries in the original spiral order instead of starting over. The
/// ledger is deleted once the job completes or is cancelled by the
/// user; only a forced cancel preserves it.
pub struct FullRenderJob {
    config: RenderConfig,
    world: Arc<dyn WorldSource>,
    renderers: Arc<RendererSet>,
    writer: Arc<TilePyramidWriter>,
    timestamps: Arc<RegionTimestamps>,
    progress: Progress,
    control: JobControl,
}

impl FullRenderJob {
    pub fn new(
        config: RenderConfig,
        world: Arc<dyn WorldSource>,
        renderers: Arc<RendererSet>,
    ) -> Result<Self, JobError> {
        let writer = Arc::new(TilePyramidWriter::new(
            config.tiles_dir.clone(),
            config.zoom_levels.saturating_sub(1),
            world.floor_height(),
        )?);
        let timestamps = Arc::new(RegionTimestamps::load_or_default(&config.state_dir)?);
        Ok(Self {
            config,
            world,
            renderers,
            writer,
            timestamps,
            progress: Progress::new(0),
            control: JobControl::new(),
        })
    }

    pub fn control(&self) -> &JobControl {
        &self.control
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Run to completion, resuming a previous interrupted run if its
    /// ledger is still on disk.
    #[instrument(skip(self), fields(world = self.world.name()))]
    pub async fn run(&self) -> Result<JobSummary, JobError> {
        let started = SystemTime::now();
        let mut ledger = match ScanLedger::load(&self.config.state_dir)? {
            Some(ledger) => {
                info!(
                    total = ledger.total(),
                    done = ledger.completed(),
                    "resuming full render"
                );
                ledger
            }
            None => {
                let regions = spiral_order(
                    self.world.origin().region(),
                    self.world.known_regions()?,
                );
                info!(total = regions.len(), "starting full render");
                let ledger = ScanLedger::create(&self.config.state_dir, regions);
                ledger.save()?;
                ledger
            }
        };

        let chunks_per_region = (REGION_CHUNKS * REGION_CHUNKS) as u64;
        self.progress
            .add_total(ledger.total() as u64 * chunks_per_region);
        self.progress
            .add_processed(ledger.completed() as u64 * chunks_per_region);

        let pending = ledger.pending();
        let ctx = BatchContext {
            world: Arc::clone(&self.world),
            renderers: Arc::clone(&self.renderers),
            writer: Arc::clone(&self.writer),
            timestamps: Arc::clone(&self.timestamps),
            pools: WorkerPools::new(self.config.render_workers, self.config.io_workers),
            control: self.control.scan_control().clone(),
            started,
        };

        let mut summary = JobSummary::default();
        let batch = run_batch(pending, &ctx, |region, ok| {
            self.progress.add_processed(chunks_per_region);
            if ok {
                ledger.mark_done(region);
                if let Err(e) = ledger.save() {
                    warn!(region = %region, error = %e, "failed to journal region completion");
                }
            }
        })
        .await;
        summary.rendered = batch.rendered;
        summary.failed = batch.failed;
        summary.cancelled = self.control.is_cancelled();

        if let Err(e) = self.timestamps.save() {
            warn!(error = %e, "failed to persist region timestamps");
        }

        if summary.cancelled && self.control.was_forced() {
            // Forced cancel: world is unloading; keep the ledger so
            // the next run resumes.
            ledger.save()?;
        } else if summary.cancelled {
            info!(
                rendered = summary.rendered,
                "full render cancelled by user"
            );
            ledger.remove()?;
        } else {
            info!(
                rendered = summary.rendered,
                failed = summary.failed,
                "full render complete"
            );
            ledger.remove()?;
        }
        Ok(summary)
    }
}
