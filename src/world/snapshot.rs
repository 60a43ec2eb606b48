//! Per-region snapshot of sampled world data.

use super::Sample;
use crate::coord::{RegionCoord, REGION_CHUNKS, REGION_COLUMNS};

/// Border width in columns (one chunk) included on every side.
///
/// Edge-aware renderers (biome-neighbor averaging, elevation shading)
/// read into the border so pixels at region edges blend the same way as
/// interior pixels.
pub const SNAPSHOT_BORDER: i32 = 16;

/// Columns per snapshot edge: the region plus both borders.
pub const SNAPSHOT_EDGE: i32 = REGION_COLUMNS + 2 * SNAPSHOT_BORDER;

/// The complete set of samples for one region plus a 1-chunk border.
///
/// Local coordinates run from `-SNAPSHOT_BORDER` (inclusive) to
/// `REGION_COLUMNS + SNAPSHOT_BORDER` (exclusive); `(0, 0)` is the
/// region's own minimum corner. Lives for exactly one region-scan task
/// and is discarded when its renderers finish.
#[derive(Debug)]
pub struct RegionSnapshot {
    region: RegionCoord,
    columns: Vec<Option<Sample>>,
    /// Accumulated activity metric per chunk of the region (32×32,
    /// row-major), consumed by the heatmap renderer.
    activity: Vec<u32>,
}

impl RegionSnapshot {
    /// Creates an empty snapshot (every column "no data").
    pub fn new(region: RegionCoord) -> Self {
        let edge = SNAPSHOT_EDGE as usize;
        Self {
            region,
            columns: vec![None; edge * edge],
            activity: vec![0; (REGION_CHUNKS * REGION_CHUNKS) as usize],
        }
    }

    pub fn region(&self) -> RegionCoord {
        self.region
    }

    #[inline]
    fn index(x: i32, z: i32) -> Option<usize> {
        if !(-SNAPSHOT_BORDER..REGION_COLUMNS + SNAPSHOT_BORDER).contains(&x)
            || !(-SNAPSHOT_BORDER..REGION_COLUMNS + SNAPSHOT_BORDER).contains(&z)
        {
            return None;
        }
        let row = (z + SNAPSHOT_BORDER) as usize;
        let col = (x + SNAPSHOT_BORDER) as usize;
        Some(row * SNAPSHOT_EDGE as usize + col)
    }

    /// The sample at local column `(x, z)`, or `None` when the column has
    /// no data or lies outside the snapshot (including its border).
    #[inline]
    pub fn sample(&self, x: i32, z: i32) -> Option<&Sample> {
        Self::index(x, z).and_then(|i| self.columns[i].as_ref())
    }

    /// Stores a sample at local column `(x, z)`. Out-of-range coordinates
    /// are ignored.
    pub fn set_sample(&mut self, x: i32, z: i32, sample: Sample) {
        if let Some(i) = Self::index(x, z) {
            self.columns[i] = Some(sample);
        }
    }

    /// Activity metric for the chunk at region-local chunk coordinates
    /// (`0..32` each). Out-of-range coordinates read as zero.
    #[inline]
    pub fn chunk_activity(&self, cx: i32, cz: i32) -> u32 {
        if !(0..REGION_CHUNKS).contains(&cx) || !(0..REGION_CHUNKS).contains(&cz) {
            return 0;
        }
        self.activity[(cz * REGION_CHUNKS + cx) as usize]
    }

    /// Sets the activity metric for a region-local chunk.
    pub fn set_chunk_activity(&mut self, cx: i32, cz: i32, value: u32) {
        if (0..REGION_CHUNKS).contains(&cx) && (0..REGION_CHUNKS).contains(&cz) {
            self.activity[(cz * REGION_CHUNKS + cx) as usize] = value;
        }
    }

    /// Number of columns carrying data.
    pub fn populated_columns(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }
}
