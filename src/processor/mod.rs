//! Background region processor.
//!
//! [`RegionProcessor`] is the long-running scheduler that keeps the
//! tile map in sync with a changing world. One instance serves one
//! world. It cycles on a timer (with an eager wake when dirt arrives),
//! drains the shared [`DirtyRegions`] set, orders the batch by spiral
//! distance from the world origin, and fans it out over the bounded
//! worker pools.
//!
//! Successful regions update the modified-state table, which is
//! persisted after every batch so a crash loses at most one cycle of
//! bookkeeping.

mod batch;
mod dirty;
mod ordering;
mod pools;

pub use batch::{run_batch, BatchContext, BatchSummary};
pub use dirty::DirtyRegions;
pub use ordering::spiral_order;
pub use pools::WorkerPools;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::coord::REGION_CHUNKS;
use crate::job::Progress;
use crate::render::RendererSet;
use crate::scan::ScanControl;
use crate::state::{RegionTimestamps, StateError};
use crate::tile::{TileError, TilePyramidWriter};
use crate::world::{WorldError, WorldSource};

/// Where the processor is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Waiting for the next tick or wake.
    Idle,
    /// Draining and ordering dirty regions.
    Queuing,
    /// A batch is in flight.
    Processing,
}

const STATE_IDLE: u8 = 0;
const STATE_QUEUING: u8 = 1;
const STATE_PROCESSING: u8 = 2;

/// Errors raised while constructing or running the processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Tile(#[from] TileError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    World(#[from] WorldError),
}

/// Scheduler keeping one world's tiles current.
pub struct RegionProcessor {
    config: RenderConfig,
    world: Arc<dyn WorldSource>,
    renderers: Arc<RendererSet>,
    writer: Arc<TilePyramidWriter>,
    timestamps: Arc<RegionTimestamps>,
    dirty: DirtyRegions,
    pools: WorkerPools,
    control: ScanControl,
    progress: Progress,
    state: AtomicU8,
    in_flight: AtomicBool,
}

impl RegionProcessor {
    /// Build a processor for `world`, creating the tile root and
    /// loading the modified-state table.
    pub fn new(
        config: RenderConfig,
        world: Arc<dyn WorldSource>,
        renderers: Arc<RendererSet>,
    ) -> Result<Self, ProcessorError> {
        let floor = world.floor_height();
        let writer = Arc::new(TilePyramidWriter::new(
            config.tiles_dir.clone(),
            config.zoom_levels.saturating_sub(1),
            floor,
        )?);
        let timestamps = Arc::new(RegionTimestamps::load_or_default(&config.state_dir)?);
        let pools = WorkerPools::new(config.render_workers, config.io_workers);
        Ok(Self {
            config,
            world,
            renderers,
            writer,
            timestamps,
            dirty: DirtyRegions::new(),
            pools,
            control: ScanControl::new(),
            progress: Progress::new(0),
            state: AtomicU8::new(STATE_IDLE),
            in_flight: AtomicBool::new(false),
        })
    }

    /// The dirty set fed by change sources. A fresh mark wakes the run
    /// loop on its own, so dirt renders without waiting out the cycle
    /// interval.
    pub fn dirty(&self) -> &DirtyRegions {
        &self.dirty
    }

    /// Pause, resume and cancel switches shared with running scans.
    pub fn control(&self) -> &ScanControl {
        &self.control
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn state(&self) -> ProcessorState {
        match self.state.load(Ordering::Acquire) {
            STATE_QUEUING => ProcessorState::Queuing,
            STATE_PROCESSING => ProcessorState::Processing,
            _ => ProcessorState::Idle,
        }
    }

    fn set_state(&self, state: ProcessorState) {
        let raw = match state {
            ProcessorState::Idle => STATE_IDLE,
            ProcessorState::Queuing => STATE_QUEUING,
            ProcessorState::Processing => STATE_PROCESSING,
        };
        self.state.store(raw, Ordering::Release);
    }

    /// Nudge the run loop to start a cycle without waiting for the
    /// timer or a new mark.
    pub fn wake(&self) {
        self.dirty.notify();
    }

    /// Sweep the world's regions, marking dirty any whose file is
    /// newer than its modified-state entry. This is how edits made
    /// while the pipeline was down are noticed.
    pub fn poll_world_changes(&self) -> Result<usize, WorldError> {
        let mut marked = 0;
        for region in self.world.known_regions()? {
            let changed = match (self.world.region_mtime(region)?, self.timestamps.last_processed(region)) {
                (Some(mtime), Some(stamp)) => mtime > stamp,
                (Some(_), None) => true,
                // No mtime available: rely on pushed marks alone.
                (None, _) => false,
            };
            if changed {
                self.dirty.mark_region(region);
                marked += 1;
            }
        }
        if marked > 0 {
            debug!(marked, "mtime sweep found changed regions");
        }
        Ok(marked)
    }

    /// Run one scheduling cycle: drain, order, render.
    ///
    /// Returns the number of regions rendered, or zero when another
    /// cycle is already in flight.
    pub async fn run_cycle(&self) -> usize {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("cycle already in flight, skipping");
            return 0;
        }
        let rendered = self.cycle_inner().await;
        self.set_state(ProcessorState::Idle);
        self.in_flight.store(false, Ordering::Release);
        rendered
    }

    async fn cycle_inner(&self) -> usize {
        self.set_state(ProcessorState::Queuing);
        let started = SystemTime::now();

        let mut batch = self.dirty.drain();
        if batch.len() > self.config.max_regions_per_cycle {
            // Over-cap regions go back in the set and render next
            // cycle; nearest regions win the slots.
            batch = spiral_order(self.world.origin().region(), batch);
            for region in batch.split_off(self.config.max_regions_per_cycle) {
                self.dirty.mark_region(region);
            }
        } else {
            batch = spiral_order(self.world.origin().region(), batch);
        }

        // Pushed marks can race a render that already absorbed the
        // change; skip any region whose file is provably older than
        // its last render.
        batch.retain(|region| {
            match (
                self.world.region_mtime(*region),
                self.timestamps.last_processed(*region),
            ) {
                (Ok(Some(mtime)), Some(stamp)) => mtime > stamp,
                _ => true,
            }
        });

        if batch.is_empty() {
            return 0;
        }
        info!(regions = batch.len(), "processing dirty regions");
        self.set_state(ProcessorState::Processing);

        let chunks_per_region = (REGION_CHUNKS * REGION_CHUNKS) as u64;
        self.progress.add_total(batch.len() as u64 * chunks_per_region);

        let ctx = BatchContext {
            world: Arc::clone(&self.world),
            renderers: Arc::clone(&self.renderers),
            writer: Arc::clone(&self.writer),
            timestamps: Arc::clone(&self.timestamps),
            pools: self.pools.clone(),
            control: self.control.clone(),
            started,
        };
        let summary = run_batch(batch, &ctx, |_, _| {
            self.progress.add_processed(chunks_per_region);
        })
        .await;

        if let Err(e) = self.timestamps.save() {
            warn!(error = %e, "failed to persist region timestamps");
        }
        if summary.failed > 0 {
            warn!(failed = summary.failed, "some regions failed and will retry");
        }
        summary.rendered
    }

    /// Drive cycles until cancelled. Ticks on the configured interval
    /// and wakes early when [`RegionProcessor::wake`] is called.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.config.cycle_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval = ?self.config.cycle_interval,
            renderers = self.renderers.len(),
            "region processor started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.dirty.notified() => {}
                _ = self.control.cancel_token().cancelled() => break,
            }
            if self.control.is_paused() {
                continue;
            }
            if let Err(e) = self.poll_world_changes() {
                warn!(error = %e, "world change sweep failed");
            }
            self.run_cycle().await;
        }
        // Final persist so a graceful shutdown never replays finished
        // regions.
        if let Err(e) = self.timestamps.save() {
            warn!(error = %e, "failed to persist region timestamps at shutdown");
        }
        info!("region processor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::pack;
    use crate::coord::{ColumnCoord, RegionCoord};
    use crate::render::{FlatRenderer, Palette, Renderer};
    use crate::world::{BiomeId, MaterialId, RegionSnapshot, Sample};
    use std::sync::Mutex;
    use std::time::{Duration, Instant, SystemTime};
    use tempfile::TempDir;

    const STONE: MaterialId = MaterialId(1);

    struct StaticWorld {
        regions: Vec<RegionCoord>,
        mtime: Option<SystemTime>,
    }

    impl WorldSource for StaticWorld {
        fn name(&self) -> &str {
            "static"
        }

        fn origin(&self) -> ColumnCoord {
            ColumnCoord::new(0, 0)
        }

        fn snapshot(&self, region: RegionCoord) -> Result<RegionSnapshot, WorldError> {
            let mut snap = RegionSnapshot::new(region);
            snap.set_sample(3, 3, Sample::solid(STONE, 70, BiomeId(0), 15));
            Ok(snap)
        }

        fn known_regions(&self) -> Result<Vec<RegionCoord>, WorldError> {
            Ok(self.regions.clone())
        }

        fn region_mtime(&self, _: RegionCoord) -> Result<Option<SystemTime>, WorldError> {
            Ok(self.mtime)
        }
    }

    fn processor(dir: &TempDir, world: StaticWorld) -> RegionProcessor {
        let mut config = RenderConfig::new(dir.path().join("tiles"), dir.path().join("state"));
        config.render_workers = 2;
        RegionProcessor::new(config, Arc::new(world), flat_renderers()).unwrap()
    }

    #[tokio::test]
    async fn cycle_renders_marked_regions() {
        let dir = TempDir::new().unwrap();
        let proc = processor(
            &dir,
            StaticWorld {
                regions: vec![RegionCoord::new(0, 0)],
                mtime: None,
            },
        );

        proc.dirty().mark_column(ColumnCoord::new(3, 3));
        let rendered = proc.run_cycle().await;
        assert_eq!(rendered, 1);
        assert_eq!(proc.state(), ProcessorState::Idle);
        assert!(dir.path().join("tiles/flat/z0/r.0.0.ttl").exists());
        assert!(proc
            .timestamps
            .last_processed(RegionCoord::new(0, 0))
            .is_some());
        // table was persisted
        assert!(dir.path().join("state/timestamps.json").exists());
    }

    #[tokio::test]
    async fn empty_cycle_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let proc = processor(
            &dir,
            StaticWorld {
                regions: vec![],
                mtime: None,
            },
        );
        assert_eq!(proc.run_cycle().await, 0);
        assert!(!dir.path().join("tiles/flat").exists());
    }

    #[tokio::test]
    async fn mtime_sweep_marks_unrendered_regions() {
        let dir = TempDir::new().unwrap();
        let proc = processor(
            &dir,
            StaticWorld {
                regions: vec![RegionCoord::new(0, 0), RegionCoord::new(1, 0)],
                mtime: Some(SystemTime::now()),
            },
        );

        assert_eq!(proc.poll_world_changes().unwrap(), 2);
        assert_eq!(proc.run_cycle().await, 2);

        // both regions now have fresh timestamps; an older mtime must
        // not re-mark them
        assert_eq!(proc.poll_world_changes().unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_pushed_marks_are_skipped() {
        let dir = TempDir::new().unwrap();
        let old = SystemTime::now() - std::time::Duration::from_secs(3600);
        let proc = processor(
            &dir,
            StaticWorld {
                regions: vec![RegionCoord::new(0, 0)],
                mtime: Some(old),
            },
        );

        proc.dirty().mark_region(RegionCoord::new(0, 0));
        assert_eq!(proc.run_cycle().await, 1);

        // region replays as dirty but its file has not changed since
        proc.dirty().mark_region(RegionCoord::new(0, 0));
        assert_eq!(proc.run_cycle().await, 0);
    }

    /// World whose backing file is touched while its snapshot is being
    /// read, like a player edit landing mid-render.
    struct EditedMidScanWorld {
        region: RegionCoord,
        mtime: Mutex<Option<SystemTime>>,
    }

    impl WorldSource for EditedMidScanWorld {
        fn name(&self) -> &str {
            "edited"
        }

        fn origin(&self) -> ColumnCoord {
            ColumnCoord::new(0, 0)
        }

        fn snapshot(&self, region: RegionCoord) -> Result<RegionSnapshot, WorldError> {
            std::thread::sleep(Duration::from_millis(5));
            *self.mtime.lock().unwrap() = Some(SystemTime::now());
            std::thread::sleep(Duration::from_millis(5));
            let mut snap = RegionSnapshot::new(region);
            snap.set_sample(0, 0, Sample::solid(STONE, 64, BiomeId(0), 15));
            Ok(snap)
        }

        fn known_regions(&self) -> Result<Vec<RegionCoord>, WorldError> {
            Ok(vec![self.region])
        }

        fn region_mtime(&self, _: RegionCoord) -> Result<Option<SystemTime>, WorldError> {
            Ok(*self.mtime.lock().unwrap())
        }
    }

    fn flat_renderers() -> Arc<RendererSet> {
        let palette = Arc::new(Palette::new().with_material(STONE, pack(255, 10, 20, 30)));
        let flat: Arc<dyn Renderer> = Arc::new(FlatRenderer::new(palette));
        Arc::new(RendererSet::new(vec![flat]).unwrap())
    }

    #[tokio::test]
    async fn edit_landing_mid_render_is_caught_by_the_next_sweep() {
        let dir = TempDir::new().unwrap();
        let mut config = RenderConfig::new(dir.path().join("tiles"), dir.path().join("state"));
        config.render_workers = 2;
        let region = RegionCoord::new(0, 0);
        let proc = RegionProcessor::new(
            config,
            Arc::new(EditedMidScanWorld {
                region,
                mtime: Mutex::new(None),
            }),
            flat_renderers(),
        )
        .unwrap();

        proc.dirty().mark_region(region);
        assert_eq!(proc.run_cycle().await, 1);

        // the file changed after the cycle started, so the stamp must
        // be older than the mtime and the sweep must re-mark it
        assert_eq!(proc.poll_world_changes().unwrap(), 1);
        assert_eq!(proc.dirty().len(), 1);
    }

    #[test]
    fn oversized_zoom_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = RenderConfig::new(dir.path().join("tiles"), dir.path().join("state"));
        config.zoom_levels = 12;
        let world = StaticWorld {
            regions: vec![],
            mtime: None,
        };
        match RegionProcessor::new(config, Arc::new(world), flat_renderers()) {
            Err(ProcessorError::Tile(TileError::TooManyZoomLevels(11))) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("oversized zoom config was accepted"),
        }
    }

    #[tokio::test]
    async fn marking_dirty_wakes_the_run_loop() {
        let dir = TempDir::new().unwrap();
        let mut proc = processor(
            &dir,
            StaticWorld {
                regions: vec![RegionCoord::new(0, 0)],
                mtime: None,
            },
        );
        // far longer than the test timeout; only a wake can render
        proc.config.cycle_interval = Duration::from_secs(3600);
        let proc = Arc::new(proc);

        let runner = {
            let proc = Arc::clone(&proc);
            tokio::spawn(async move { proc.run().await })
        };
        // let the startup tick pass with nothing dirty
        tokio::time::sleep(Duration::from_millis(50)).await;

        proc.dirty().mark_region(RegionCoord::new(0, 0));

        let tile = dir.path().join("tiles/flat/z0/r.0.0.ttl");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !tile.exists() {
            assert!(
                Instant::now() < deadline,
                "run loop never woke for the mark"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        proc.control().cancel();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn cycle_cap_defers_excess_regions() {
        let dir = TempDir::new().unwrap();
        let regions: Vec<RegionCoord> = (0..5).map(|x| RegionCoord::new(x, 0)).collect();
        let mut proc = processor(
            &dir,
            StaticWorld {
                regions: regions.clone(),
                mtime: None,
            },
        );
        proc.config.max_regions_per_cycle = 3;

        for region in &regions {
            proc.dirty().mark_region(*region);
        }
        assert_eq!(proc.run_cycle().await, 3);
        assert_eq!(proc.dirty().len(), 2);
        assert_eq!(proc.run_cycle().await, 2);
        assert!(proc.dirty().is_empty());
    }
}
