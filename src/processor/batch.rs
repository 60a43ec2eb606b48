//! Concurrent execution of one ordered batch of region scans.
//!
//! Each region flows through two gated stages: a render permit admits
//! the CPU-heavy scan, then an IO permit admits the tile writes. Both
//! stages run on the blocking thread pool since they are synchronous
//! work; the async side only sequences permits and collects results.
//!
//! A region's failure never aborts the batch. Failed regions keep
//! their stale modified-state entry so a later cycle retries them.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::coord::{RegionCoord, REGION_CHUNKS};
use crate::render::RendererSet;
use crate::scan::{RegionScanTask, ScanControl, ScanError, ScanOutcome};
use crate::state::RegionTimestamps;
use crate::tile::TilePyramidWriter;
use crate::world::WorldSource;

use super::pools::WorkerPools;

/// Aggregate result of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Regions scanned and saved.
    pub rendered: usize,
    /// Regions that errored; they remain due for a retry.
    pub failed: usize,
    /// Regions skipped because the batch was cancelled mid-flight.
    pub cancelled: usize,
}

/// Shared inputs for every region in a batch.
#[derive(Clone)]
pub struct BatchContext {
    pub world: Arc<dyn WorldSource>,
    pub renderers: Arc<RendererSet>,
    pub writer: Arc<TilePyramidWriter>,
    pub timestamps: Arc<RegionTimestamps>,
    pub pools: WorkerPools,
    pub control: ScanControl,
    /// When the enclosing cycle or job started. Successful renders are
    /// stamped with this, so edits landing mid-render stay newer than
    /// their region's modified-state entry.
    pub started: SystemTime,
}

enum RegionStatus {
    Rendered(ScanOutcome),
    Cancelled,
    Failed(ScanError),
}

/// Run `regions` through the scan pipeline, in order of dispatch.
///
/// `on_done` fires once per region as it completes (success or not),
/// with `true` for a successful render. Successful regions are
/// recorded in the modified-state table; the caller persists the
/// table after the batch.
pub async fn run_batch(
    regions: Vec<RegionCoord>,
    ctx: &BatchContext,
    mut on_done: impl FnMut(RegionCoord, bool),
) -> BatchSummary {
    let mut tasks: JoinSet<(RegionCoord, RegionStatus)> = JoinSet::new();
    for region in regions {
        let ctx = ctx.clone();
        tasks.spawn(async move { (region, scan_one(region, ctx).await) });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        let (region, status) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                // A panicked worker loses its region coordinate; the
                // region stays dirty in the modified-state sense and
                // renders again on a later cycle.
                warn!(error = %e, "region scan worker panicked");
                summary.failed += 1;
                continue;
            }
        };
        match status {
            RegionStatus::Rendered(outcome) => {
                ctx.timestamps.record(region, ctx.started);
                debug!(
                    region = %region,
                    column_errors = outcome.column_errors,
                    "region rendered"
                );
                summary.rendered += 1;
                on_done(region, true);
            }
            RegionStatus::Cancelled => {
                summary.cancelled += 1;
                on_done(region, false);
            }
            RegionStatus::Failed(e) => {
                warn!(region = %region, error = %e, "region scan failed");
                summary.failed += 1;
                on_done(region, false);
            }
        }
    }
    summary
}

async fn scan_one(region: RegionCoord, ctx: BatchContext) -> RegionStatus {
    let task = RegionScanTask::new(
        region,
        Arc::clone(&ctx.renderers),
        Arc::clone(&ctx.writer),
        ctx.control.clone(),
    );

    // Render stage.
    let render_permit = match ctx.pools.render().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return RegionStatus::Cancelled,
    };
    if ctx.control.is_cancelled() {
        return RegionStatus::Cancelled;
    }
    let world = Arc::clone(&ctx.world);
    let scan_task = task.clone();
    let scanned = match tokio::task::spawn_blocking(move || scan_task.scan(world.as_ref())).await {
        Ok(Ok(Some(scanned))) => scanned,
        Ok(Ok(None)) => return RegionStatus::Cancelled,
        Ok(Err(e)) => return RegionStatus::Failed(e),
        Err(e) => return RegionStatus::Failed(ScanError::Panicked(e.to_string())),
    };
    drop(render_permit);

    // Save stage.
    let _io_permit = match ctx.pools.io().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return RegionStatus::Cancelled,
    };
    if ctx.control.is_cancelled() {
        return RegionStatus::Cancelled;
    }
    let save_task = task.clone();
    match tokio::task::spawn_blocking(move || {
        let column_errors = scanned.column_errors;
        save_task.save(&scanned).map(|()| column_errors)
    })
    .await
    {
        Ok(Ok(column_errors)) => RegionStatus::Rendered(ScanOutcome {
            region,
            column_errors,
            cancelled: false,
            chunks_scanned: (REGION_CHUNKS * REGION_CHUNKS) as u32,
        }),
        Ok(Err(e)) => RegionStatus::Failed(e),
        Err(e) => RegionStatus::Failed(ScanError::Panicked(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::pack;
    use crate::coord::ColumnCoord;
    use crate::render::{FlatRenderer, Palette, Renderer};
    use crate::world::{
        BiomeId, MaterialId, RegionSnapshot, Sample, WorldError,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;
    use tempfile::TempDir;

    const STONE: MaterialId = MaterialId(1);

    struct GridWorld {
        regions: Vec<RegionCoord>,
    }

    impl WorldSource for GridWorld {
        fn name(&self) -> &str {
            "grid"
        }

        fn origin(&self) -> ColumnCoord {
            ColumnCoord::new(0, 0)
        }

        fn snapshot(&self, region: RegionCoord) -> Result<RegionSnapshot, WorldError> {
            if !self.regions.contains(&region) {
                return Err(WorldError::Unavailable("region outside the grid".into()));
            }
            let mut snap = RegionSnapshot::new(region);
            snap.set_sample(0, 0, Sample::solid(STONE, 64, BiomeId(0), 15));
            Ok(snap)
        }

        fn known_regions(&self) -> Result<Vec<RegionCoord>, WorldError> {
            Ok(self.regions.clone())
        }

        fn region_mtime(&self, _: RegionCoord) -> Result<Option<SystemTime>, WorldError> {
            Ok(None)
        }
    }

    fn context(dir: &TempDir, world: GridWorld) -> BatchContext {
        let palette = Arc::new(Palette::new().with_material(STONE, pack(255, 200, 100, 50)));
        let flat: Arc<dyn Renderer> = Arc::new(FlatRenderer::new(palette));
        BatchContext {
            world: Arc::new(world),
            renderers: Arc::new(RendererSet::new(vec![flat]).unwrap()),
            writer: Arc::new(TilePyramidWriter::new(dir.path().join("tiles"), 1, 0).unwrap()),
            timestamps: Arc::new(
                RegionTimestamps::load_or_default(&dir.path().join("state")).unwrap(),
            ),
            pools: WorkerPools::new(2, 1),
            control: ScanControl::new(),
            started: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn batch_renders_and_records_timestamps() {
        let dir = TempDir::new().unwrap();
        let good = RegionCoord::new(0, 0);
        let ctx = context(&dir, GridWorld { regions: vec![good] });

        let done = AtomicUsize::new(0);
        let summary = run_batch(vec![good], &ctx, |region, ok| {
            assert_eq!(region, good);
            assert!(ok);
            done.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(summary, BatchSummary { rendered: 1, failed: 0, cancelled: 0 });
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(ctx.timestamps.last_processed(good).is_some());
        assert!(dir.path().join("tiles/flat/z0/r.0.0.ttl").exists());
    }

    #[tokio::test]
    async fn failed_region_keeps_stale_timestamp() {
        let dir = TempDir::new().unwrap();
        let good = RegionCoord::new(0, 0);
        let bad = RegionCoord::new(5, 5);
        let ctx = context(&dir, GridWorld { regions: vec![good] });

        let summary = run_batch(vec![good, bad], &ctx, |_, _| {}).await;

        assert_eq!(summary.rendered, 1);
        assert_eq!(summary.failed, 1);
        assert!(ctx.timestamps.last_processed(good).is_some());
        assert!(ctx.timestamps.last_processed(bad).is_none());
    }

    #[tokio::test]
    async fn cancelled_batch_skips_remaining_regions() {
        let dir = TempDir::new().unwrap();
        let regions = vec![RegionCoord::new(0, 0), RegionCoord::new(0, 1)];
        let ctx = context(
            &dir,
            GridWorld {
                regions: regions.clone(),
            },
        );
        ctx.control.cancel();

        let summary = run_batch(regions, &ctx, |_, ok| assert!(!ok)).await;
        assert_eq!(summary.rendered, 0);
        assert_eq!(summary.cancelled, 2);
        assert!(!dir.path().join("tiles/flat/z0/r.0.0.ttl").exists());
    }
}
