//! Region scan task: the unit of work of the pipeline.
//!
//! One task loads the samples for one region, runs every active renderer
//! over them and persists the resulting buffers through the pyramid
//! writer. The task is split into a CPU-bound [`RegionScanTask::scan`]
//! stage and an IO-bound [`RegionScanTask::save`] stage so the scheduler
//! can gate them on separate worker pools.

use crate::coord::{RegionCoord, CHUNK_COLUMNS, REGION_CHUNKS};
use crate::render::{PassOutputs, RenderOutput, RendererSet};
use crate::tile::{TileError, TilePyramidWriter};
use crate::world::{WorldError, WorldSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Errors that abort a whole region scan.
///
/// Per-column coloring failures are not represented here: they are
/// recovered inside the scan loop (pixel left transparent) and only
/// counted.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The world source could not produce the region's snapshot.
    #[error("world error: {0}")]
    World(#[from] WorldError),

    /// A tile write failed; the region counts as not-yet-rendered and is
    /// retried on a later cycle.
    #[error("tile write failed: {0}")]
    Tile(#[from] TileError),

    /// The worker running the task panicked.
    #[error("scan task panicked: {0}")]
    Panicked(String),
}

/// Shared pause/cancel switches threaded into every scan loop.
///
/// Cancellation is cooperative: the flag is polled at chunk granularity,
/// which bounds worst-case cancellation latency without paying a check
/// per column. The pause gate is the only intentional blocking point
/// inside a unit of work.
#[derive(Debug, Clone)]
pub struct ScanControl {
    cancel: CancellationToken,
    pause: Arc<AtomicBool>,
    pause_poll: Duration,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Builds a control sharing an externally owned cancellation token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            pause: Arc::new(AtomicBool::new(false)),
            pause_poll: Duration::from_millis(25),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn set_paused(&self, paused: bool) {
        self.pause.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Acquire)
    }

    /// Sleeps while paused; returns early when cancelled.
    fn wait_while_paused(&self) {
        while self.is_paused() && !self.is_cancelled() {
            std::thread::sleep(self.pause_poll);
        }
    }
}

impl Default for ScanControl {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory result of the scan stage, awaiting persistence.
pub struct ScannedRegion {
    pub region: RegionCoord,
    /// One output per renderer, in the set's execution order.
    outputs: Vec<RenderOutput>,
    pub column_errors: u32,
}

/// Final result of one region scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub region: RegionCoord,
    pub column_errors: u32,
    pub cancelled: bool,
    pub chunks_scanned: u32,
}

/// Scans one region with a fixed set of renderers and persists the
/// outputs.
#[derive(Clone)]
pub struct RegionScanTask {
    region: RegionCoord,
    renderers: Arc<RendererSet>,
    writer: Arc<TilePyramidWriter>,
    control: ScanControl,
}

impl RegionScanTask {
    pub fn new(
        region: RegionCoord,
        renderers: Arc<RendererSet>,
        writer: Arc<TilePyramidWriter>,
        control: ScanControl,
    ) -> Self {
        Self {
            region,
            renderers,
            writer,
            control,
        }
    }

    pub fn region(&self) -> RegionCoord {
        self.region
    }

    /// Loads the snapshot and runs every renderer over every column.
    ///
    /// Returns `Ok(None)` when cancelled; nothing has been written to
    /// disk in that case. Each column's sample is computed once and
    /// dispatched to every renderer in dependency order; later renderers
    /// see earlier renderers' populated buffers through [`PassOutputs`].
    #[instrument(skip(self, world), fields(world = world.name(), region = %self.region))]
    pub fn scan(&self, world: &dyn WorldSource) -> Result<Option<ScannedRegion>, ScanError> {
        if self.control.is_cancelled() {
            return Ok(None);
        }

        let snapshot = world.snapshot(self.region)?;

        let renderers: Vec<_> = self.renderers.iter().collect();
        let ids = self.renderers.ids();
        let mut outputs: Vec<RenderOutput> = renderers
            .iter()
            .map(|r| {
                let mut out = r.allocate(self.region);
                r.begin_region(&snapshot, &mut out);
                out
            })
            .collect();

        let mut column_errors = 0u32;
        for cz in 0..REGION_CHUNKS {
            for cx in 0..REGION_CHUNKS {
                // cancellation and pause are checked once per chunk
                self.control.wait_while_paused();
                if self.control.is_cancelled() {
                    debug!(region = %self.region, "scan cancelled mid-region");
                    return Ok(None);
                }

                for lz in 0..CHUNK_COLUMNS {
                    for lx in 0..CHUNK_COLUMNS {
                        let x = cx * CHUNK_COLUMNS + lx;
                        let z = cz * CHUNK_COLUMNS + lz;
                        let Some(sample) = snapshot.sample(x, z) else {
                            continue;
                        };

                        for (i, renderer) in renderers.iter().enumerate() {
                            let (done, rest) = outputs.split_at_mut(i);
                            let pass = PassOutputs::new(&ids[..i], done);
                            if renderer
                                .render_column(&snapshot, x, z, sample, &mut rest[0], &pass)
                                .is_err()
                            {
                                // transient per-column failure: pixel
                                // stays transparent, scan continues
                                column_errors += 1;
                            }
                        }
                    }
                }
            }
        }

        if column_errors > 0 {
            warn!(
                region = %self.region,
                column_errors,
                "columns failed to color and were left transparent"
            );
        }

        Ok(Some(ScannedRegion {
            region: self.region,
            outputs,
            column_errors,
        }))
    }

    /// Persists every renderer's buffers through the pyramid writer.
    ///
    /// One renderer's write failure is logged and does not abort sibling
    /// renderers; the first error is still returned so the caller leaves
    /// the region marked unrendered.
    pub fn save(&self, scanned: &ScannedRegion) -> Result<(), ScanError> {
        let mut first_err: Option<TileError> = None;

        for (renderer, output) in self.renderers.iter().zip(&scanned.outputs) {
            let mode = renderer.downsample();
            let mut targets = vec![(renderer.id().to_string(), output.primary.pixels())];
            for side in &output.sides {
                targets.push((
                    format!("{}_{}", renderer.id(), side.suffix),
                    side.buffer.pixels(),
                ));
            }

            for (tile_id, pixels) in targets {
                if let Err(err) = self.writer.save(&tile_id, mode, scanned.region, pixels) {
                    warn!(
                        renderer = tile_id.as_str(),
                        region = %scanned.region,
                        error = %err,
                        "tile save failed"
                    );
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Convenience wrapper: scan then save.
    pub fn run(&self, world: &dyn WorldSource) -> Result<ScanOutcome, ScanError> {
        match self.scan(world)? {
            None => Ok(ScanOutcome {
                region: self.region,
                column_errors: 0,
                cancelled: true,
                chunks_scanned: 0,
            }),
            Some(scanned) => {
                self.save(&scanned)?;
                Ok(ScanOutcome {
                    region: self.region,
                    column_errors: scanned.column_errors,
                    cancelled: false,
                    chunks_scanned: (REGION_CHUNKS * REGION_CHUNKS) as u32,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::pack;
    use crate::coord::ColumnCoord;
    use crate::render::{
        FlatRenderer, Palette, PassOutputs, RenderError, RenderOutput, Renderer,
    };
    use crate::world::{BiomeId, MaterialId, RegionSnapshot, Sample};
    use std::time::SystemTime;
    use tempfile::TempDir;

    const STONE: MaterialId = MaterialId(1);
    const RED: u32 = pack(255, 255, 0, 0);

    /// World with a handful of explicit columns; everything else is
    /// "no data".
    struct TestWorld {
        columns: Vec<(i32, i32, Sample)>,
    }

    impl TestWorld {
        fn single_column(x: i32, z: i32) -> Self {
            Self {
                columns: vec![(x, z, Sample::solid(STONE, 64, BiomeId(0), 15))],
            }
        }
    }

    impl WorldSource for TestWorld {
        fn name(&self) -> &str {
            "test-world"
        }

        fn origin(&self) -> ColumnCoord {
            ColumnCoord::new(0, 0)
        }

        fn snapshot(&self, region: RegionCoord) -> Result<RegionSnapshot, WorldError> {
            let mut snap = RegionSnapshot::new(region);
            let origin = region.column_origin();
            for (x, z, sample) in &self.columns {
                snap.set_sample(x - origin.x, z - origin.z, sample.clone());
            }
            Ok(snap)
        }

        fn known_regions(&self) -> Result<Vec<RegionCoord>, WorldError> {
            Ok(vec![RegionCoord::new(0, 0)])
        }

        fn region_mtime(&self, _: RegionCoord) -> Result<Option<SystemTime>, WorldError> {
            Ok(None)
        }
    }

    struct AlwaysFailing;

    impl Renderer for AlwaysFailing {
        fn id(&self) -> &'static str {
            "failing"
        }
        fn render_column(
            &self,
            _: &RegionSnapshot,
            _: i32,
            _: i32,
            _: &Sample,
            _: &mut RenderOutput,
            _: &PassOutputs<'_>,
        ) -> Result<(), RenderError> {
            Err(RenderError::Other("boom".into()))
        }
    }

    fn palette() -> Arc<Palette> {
        Arc::new(Palette::new().with_material(STONE, RED))
    }

    fn writer(dir: &TempDir) -> Arc<TilePyramidWriter> {
        Arc::new(TilePyramidWriter::new(dir.path(), 1, 0).unwrap())
    }

    fn flat_set() -> Arc<RendererSet> {
        let flat: Arc<dyn Renderer> = Arc::new(FlatRenderer::new(palette()));
        Arc::new(RendererSet::new(vec![flat]).unwrap())
    }

    #[test]
    fn scan_and_save_produce_expected_pixel() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let renderers = flat_set();

        let world = TestWorld::single_column(10, 7);
        let task = RegionScanTask::new(
            RegionCoord::new(0, 0),
            renderers,
            Arc::clone(&writer),
            ScanControl::new(),
        );

        let outcome = task.run(&world).unwrap();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.column_errors, 0);
        assert_eq!(outcome.chunks_scanned, 1024);

        let tile = writer
            .read("flat", 0, RegionCoord::new(0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(tile.get(10, 7), RED);
        assert_eq!(tile.get(11, 7), 0);
    }

    #[test]
    fn pre_cancelled_task_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let renderers = flat_set();

        let control = ScanControl::new();
        control.cancel();

        let world = TestWorld::single_column(0, 0);
        let task =
            RegionScanTask::new(RegionCoord::new(0, 0), renderers, Arc::clone(&writer), control);

        let outcome = task.run(&world).unwrap();
        assert!(outcome.cancelled);
        assert!(writer.read("flat", 0, RegionCoord::new(0, 0)).unwrap().is_none());
    }

    #[test]
    fn cancellation_mid_scan_skips_save() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        /// Renderer that trips the cancellation token on its first column.
        struct CancellingRenderer {
            control: ScanControl,
        }
        impl Renderer for CancellingRenderer {
            fn id(&self) -> &'static str {
                "cancelling"
            }
            fn render_column(
                &self,
                _: &RegionSnapshot,
                _: i32,
                _: i32,
                _: &Sample,
                _: &mut RenderOutput,
                _: &PassOutputs<'_>,
            ) -> Result<(), RenderError> {
                self.control.cancel();
                Ok(())
            }
        }

        let control = ScanControl::new();
        let renderers = Arc::new(
            RendererSet::new(vec![Arc::new(CancellingRenderer {
                control: control.clone(),
            }) as Arc<dyn Renderer>])
            .unwrap(),
        );

        let world = TestWorld::single_column(0, 0);
        let task = RegionScanTask::new(
            RegionCoord::new(0, 0),
            renderers,
            Arc::clone(&writer),
            control,
        );

        let outcome = task.run(&world).unwrap();
        assert!(outcome.cancelled);
        assert!(writer
            .read("cancelling", 0, RegionCoord::new(0, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn column_failure_is_counted_and_siblings_still_save() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let renderers = Arc::new(
            RendererSet::new(vec![
                Arc::new(AlwaysFailing) as Arc<dyn Renderer>,
                Arc::new(FlatRenderer::new(palette())),
            ])
            .unwrap(),
        );

        let world = TestWorld::single_column(5, 5);
        let task = RegionScanTask::new(
            RegionCoord::new(0, 0),
            renderers,
            Arc::clone(&writer),
            ScanControl::new(),
        );

        let outcome = task.run(&world).unwrap();
        assert_eq!(outcome.column_errors, 1);

        // failing renderer leaves a transparent tile; flat still renders
        let failing = writer
            .read("failing", 0, RegionCoord::new(0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(failing.get(5, 5), 0);
        let flat = writer.read("flat", 0, RegionCoord::new(0, 0)).unwrap().unwrap();
        assert_eq!(flat.get(5, 5), RED);
    }

    #[test]
    fn pause_gate_blocks_until_released() {
        let control = ScanControl::new();
        control.set_paused(true);
        let released = control.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            released.set_paused(false);
        });

        let start = std::time::Instant::now();
        control.wait_while_paused();
        assert!(start.elapsed() >= Duration::from_millis(50));
        handle.join().unwrap();
    }

    #[test]
    fn negative_region_coordinates_scan_correctly() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let renderers = flat_set();

        // column (-500, -2) lives in region (-1, -1) at local (12, 510)
        let world = TestWorld::single_column(-500, -2);
        let task = RegionScanTask::new(
            RegionCoord::new(-1, -1),
            renderers,
            Arc::clone(&writer),
            ScanControl::new(),
        );
        task.run(&world).unwrap();

        let tile = writer
            .read("flat", 0, RegionCoord::new(-1, -1))
            .unwrap()
            .unwrap();
        assert_eq!(tile.get(12, 510), RED);
    }
}
