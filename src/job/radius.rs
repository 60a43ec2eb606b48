//! Render the surroundings of a point.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::{info, instrument};

use crate::config::RenderConfig;
use crate::coord::{ColumnCoord, RegionCoord, REGION_CHUNKS};
use crate::processor::{run_batch, spiral_order, BatchContext, WorkerPools};
use crate::render::RendererSet;
use crate::state::RegionTimestamps;
use crate::tile::TilePyramidWriter;
use crate::world::WorldSource;

use super::{JobControl, JobError, JobSummary, Progress};

/// Regions whose column extent intersects a square of `radius` columns
/// around `center`, nearest first.
pub fn regions_in_radius(center: ColumnCoord, radius: u32) -> Vec<RegionCoord> {
    let r = radius as i32;
    let min = ColumnCoord::new(center.x.saturating_sub(r), center.z.saturating_sub(r)).region();
    let max = ColumnCoord::new(center.x.saturating_add(r), center.z.saturating_add(r)).region();
    let mut regions = Vec::new();
    for x in min.x..=max.x {
        for z in min.z..=max.z {
            regions.push(RegionCoord::new(x, z));
        }
    }
    spiral_order(center.region(), regions)
}

/// One-shot render of everything within `radius` columns of `center`.
///
/// Unlike [`super::FullRenderJob`] this keeps no resume ledger; the
/// covered area is small enough to redo.
pub struct RadiusRenderJob {
    config: RenderConfig,
    world: Arc<dyn WorldSource>,
    renderers: Arc<RendererSet>,
    writer: Arc<TilePyramidWriter>,
    timestamps: Arc<RegionTimestamps>,
    center: ColumnCoord,
    radius: u32,
    progress: Progress,
    control: JobControl,
}

impl RadiusRenderJob {
    pub fn new(
        config: RenderConfig,
        world: Arc<dyn WorldSource>,
        renderers: Arc<RendererSet>,
        center: ColumnCoord,
        radius: u32,
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
            center,
            radius,
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

    #[instrument(skip(self), fields(center = %self.center, radius = self.radius))]
    pub async fn run(&self) -> Result<JobSummary, JobError> {
        let started = SystemTime::now();
        let regions = regions_in_radius(self.center, self.radius);
        info!(regions = regions.len(), "starting radius render");

        let chunks_per_region = (REGION_CHUNKS * REGION_CHUNKS) as u64;
        self.progress
            .add_total(regions.len() as u64 * chunks_per_region);

        let ctx = BatchContext {
            world: Arc::clone(&self.world),
            renderers: Arc::clone(&self.renderers),
            writer: Arc::clone(&self.writer),
            timestamps: Arc::clone(&self.timestamps),
            pools: WorkerPools::new(self.config.render_workers, self.config.io_workers),
            control: self.control.scan_control().clone(),
            started,
        };
        let batch = run_batch(regions, &ctx, |_, _| {
            self.progress.add_processed(chunks_per_region);
        })
        .await;

        if let Err(e) = self.timestamps.save() {
            tracing::warn!(error = %e, "failed to persist region timestamps");
        }

        let summary = JobSummary {
            rendered: batch.rendered,
            failed: batch.failed,
            cancelled: self.control.is_cancelled(),
        };
        if summary.cancelled && !self.control.was_forced() {
            info!(rendered = summary.rendered, "radius render cancelled by user");
        } else if !summary.cancelled {
            info!(rendered = summary.rendered, "radius render complete");
        }
        Ok(summary)
    }
}
