//! Shared mock world for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use terratile::coord::{ColumnCoord, RegionCoord};
use terratile::world::{BiomeId, MaterialId, RegionSnapshot, Sample, WorldError, WorldSource};

pub const STONE: MaterialId = MaterialId(1);
pub const GRASS: MaterialId = MaterialId(2);

/// World backed by an explicit column list; everything else is empty.
pub struct MockWorld {
    columns: Vec<(i32, i32, Sample)>,
    regions: Vec<RegionCoord>,
    snapshots: AtomicUsize,
}

impl MockWorld {
    pub fn new(regions: Vec<RegionCoord>) -> Self {
        Self {
            columns: Vec::new(),
            regions,
            snapshots: AtomicUsize::new(0),
        }
    }

    /// Add a solid column at world coordinates.
    pub fn with_column(mut self, x: i32, z: i32, material: MaterialId, height: i32) -> Self {
        self.columns
            .push((x, z, Sample::solid(material, height, BiomeId(0), 15)));
        self
    }

    /// How many region snapshots have been taken.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }
}

impl WorldSource for MockWorld {
    fn name(&self) -> &str {
        "mock"
    }

    fn origin(&self) -> ColumnCoord {
        ColumnCoord::new(0, 0)
    }

    fn snapshot(&self, region: RegionCoord) -> Result<RegionSnapshot, WorldError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        let mut snap = RegionSnapshot::new(region);
        let origin = region.column_origin();
        for (x, z, sample) in &self.columns {
            snap.set_sample(x - origin.x, z - origin.z, sample.clone());
        }
        Ok(snap)
    }

    fn known_regions(&self) -> Result<Vec<RegionCoord>, WorldError> {
        Ok(self.regions.clone())
    }

    fn region_mtime(&self, _: RegionCoord) -> Result<Option<SystemTime>, WorldError> {
        Ok(None)
    }
}
