//! World data model and the external world-source boundary.
//!
//! The pipeline never parses world storage itself. It consumes an opaque
//! [`WorldSource`] that answers coordinate-addressed questions: the
//! scanned state of every column in a region (a [`RegionSnapshot`]), the
//! set of regions with on-disk presence, and per-region file modification
//! times for the polling change-detection fallback.

mod snapshot;

pub use snapshot::{RegionSnapshot, SNAPSHOT_BORDER, SNAPSHOT_EDGE};

use crate::coord::{ColumnCoord, RegionCoord};
use std::time::SystemTime;
use thiserror::Error;

/// Identifier of a solid or fluid material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u16);

/// Identifier of a biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BiomeId(pub u16);

/// Fluid covering a column's surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fluid {
    pub material: MaterialId,
    /// Fluid depth in blocks above the solid surface.
    pub depth: u8,
}

/// The scanned state of one column for one region-scan pass.
///
/// Immutable once produced; the owning [`RegionSnapshot`] hands renderers
/// shared references for the duration of a single scan task.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Topmost non-air material.
    pub material: MaterialId,
    /// Height of the topmost surface block.
    pub height: i32,
    /// Fluid above the surface, if any.
    pub fluid: Option<Fluid>,
    /// Biome at the surface.
    pub biome: BiomeId,
    /// Ambient light level (0–15) one block above the surface.
    pub light: u8,
    /// Translucent overlay colors accumulated while scanning downward,
    /// topmost first.
    pub overlays: Vec<u32>,
}

impl Sample {
    /// A minimal opaque sample, handy for tests and synthetic worlds.
    pub fn solid(material: MaterialId, height: i32, biome: BiomeId, light: u8) -> Self {
        Self {
            material,
            height,
            fluid: None,
            biome,
            light,
            overlays: Vec::new(),
        }
    }
}

/// Errors surfaced by a world data source.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The source is not available at all (fatal configuration error).
    #[error("world data source unavailable: {0}")]
    Unavailable(String),

    /// One region could not be read.
    #[error("failed to read region {region}: {message}")]
    ReadFailed {
        region: RegionCoord,
        message: String,
    },

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous, thread-safe, coordinate-addressed world reader.
///
/// Implementations must be safe to call concurrently from multiple render
/// workers for different regions. A column with no data (unloaded or
/// non-existent chunk) is represented as `None` in the snapshot and
/// renders fully transparent.
pub trait WorldSource: Send + Sync {
    /// Short name for logging (e.g. the world's identifier).
    fn name(&self) -> &str;

    /// The world's spawn/origin column; spiral ordering centers here.
    fn origin(&self) -> ColumnCoord;

    /// Samples a region plus its 1-chunk border.
    fn snapshot(&self, region: RegionCoord) -> Result<RegionSnapshot, WorldError>;

    /// Every region with on-disk presence, used by full renders.
    fn known_regions(&self) -> Result<Vec<RegionCoord>, WorldError>;

    /// Last modification time of a region's backing file, `None` when the
    /// region has no file. Drives the polling change-detection fallback.
    fn region_mtime(&self, region: RegionCoord) -> Result<Option<SystemTime>, WorldError>;

    /// Lowest build height of the world; stored in tile headers and used
    /// to bias exported height values.
    fn floor_height(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_sample_has_no_fluid_or_overlays() {
        let s = Sample::solid(MaterialId(7), 64, BiomeId(2), 15);
        assert_eq!(s.material, MaterialId(7));
        assert_eq!(s.height, 64);
        assert!(s.fluid.is_none());
        assert!(s.overlays.is_empty());
    }

    #[test]
    fn world_error_messages() {
        let err = WorldError::ReadFailed {
            region: RegionCoord::new(1, -2),
            message: "truncated".into(),
        };
        assert_eq!(err.to_string(), "failed to read region r(1,-2): truncated");
    }
}
