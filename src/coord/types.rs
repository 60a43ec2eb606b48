//! Coordinate type definitions.

use std::fmt;

/// Columns per chunk edge (shift 4).
pub const CHUNK_COLUMNS: i32 = 16;
/// Chunks per region edge (shift 5).
pub const REGION_CHUNKS: i32 = 32;
/// Columns per region edge (shift 9).
pub const REGION_COLUMNS: i32 = 512;

/// Column → chunk shift.
pub const CHUNK_SHIFT: u32 = 4;
/// Chunk → region shift.
pub const REGION_CHUNK_SHIFT: u32 = 5;
/// Column → region shift.
pub const REGION_COLUMN_SHIFT: u32 = 9;

/// A single vertical column in the world grid.
///
/// Columns are the finest spatial unit the pipeline addresses; one column
/// produces one pixel at native (zoom 0) resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnCoord {
    pub x: i32,
    pub z: i32,
}

impl ColumnCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing this column.
    ///
    /// Arithmetic shift gives exact floor semantics for negative
    /// coordinates; no rounding ambiguity anywhere in the pipeline.
    #[inline]
    pub const fn chunk(&self) -> ChunkCoord {
        ChunkCoord {
            x: self.x >> CHUNK_SHIFT,
            z: self.z >> CHUNK_SHIFT,
        }
    }

    /// The region containing this column.
    #[inline]
    pub const fn region(&self) -> RegionCoord {
        RegionCoord {
            x: self.x >> REGION_COLUMN_SHIFT,
            z: self.z >> REGION_COLUMN_SHIFT,
        }
    }
}

impl fmt::Display for ColumnCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.z)
    }
}

/// A 16×16-column unit of world storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The region containing this chunk.
    #[inline]
    pub const fn region(&self) -> RegionCoord {
        RegionCoord {
            x: self.x >> REGION_CHUNK_SHIFT,
            z: self.z >> REGION_CHUNK_SHIFT,
        }
    }

    /// The minimum-corner column of this chunk.
    #[inline]
    pub const fn column_origin(&self) -> ColumnCoord {
        ColumnCoord {
            x: self.x << CHUNK_SHIFT,
            z: self.z << CHUNK_SHIFT,
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c({},{})", self.x, self.z)
    }
}

/// A 32×32-chunk (512×512-column) unit of rendering and tile storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoord {
    pub x: i32,
    pub z: i32,
}

impl RegionCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The minimum-corner column of this region.
    #[inline]
    pub const fn column_origin(&self) -> ColumnCoord {
        ColumnCoord {
            x: self.x << REGION_COLUMN_SHIFT,
            z: self.z << REGION_COLUMN_SHIFT,
        }
    }

    /// The minimum-corner chunk of this region.
    #[inline]
    pub const fn chunk_origin(&self) -> ChunkCoord {
        ChunkCoord {
            x: self.x << REGION_CHUNK_SHIFT,
            z: self.z << REGION_CHUNK_SHIFT,
        }
    }

    /// Chebyshev (chessboard) distance to another region.
    ///
    /// This is the metric spiral ordering is built on: one ring of the
    /// spiral is exactly the set of regions at one Chebyshev distance.
    #[inline]
    pub fn chebyshev_distance(&self, other: RegionCoord) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        dx.max(dz)
    }

    /// The parent tile coordinate at a zoom-out level (1 or greater).
    ///
    /// At level `zoom` one tile covers a 2^zoom × 2^zoom block of regions;
    /// arithmetic shift keeps flooring exact for negative coordinates.
    #[inline]
    pub const fn zoom_parent(&self, zoom: u8) -> RegionCoord {
        RegionCoord {
            x: self.x >> zoom,
            z: self.z >> zoom,
        }
    }

    /// Position of this region within its zoom-out parent, in child units.
    ///
    /// Both components are in `0..2^zoom`. Two's-complement masking yields
    /// the correct low bits for negative coordinates as well.
    #[inline]
    pub const fn zoom_offset(&self, zoom: u8) -> (u32, u32) {
        let mask = (1i32 << zoom) - 1;
        ((self.x & mask) as u32, (self.z & mask) as u32)
    }

    /// Returns an iterator over all 1024 chunks in this region.
    ///
    /// Chunks are yielded in row-major order (z 0 columns 0-31, z 1
    /// columns 0-31, and so on).
    #[inline]
    pub fn chunks(&self) -> RegionChunksIterator {
        RegionChunksIterator {
            region: *self,
            current: 0,
        }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r({},{})", self.x, self.z)
    }
}

/// Iterator over all chunks in a region.
///
/// Yields 1024 chunks (32×32) in row-major order.
#[derive(Debug, Clone)]
pub struct RegionChunksIterator {
    region: RegionCoord,
    current: u16,
}

impl Iterator for RegionChunksIterator {
    type Item = ChunkCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= 1024 {
            return None;
        }

        let dz = (self.current / 32) as i32;
        let dx = (self.current % 32) as i32;
        self.current += 1;

        let origin = self.region.chunk_origin();
        Some(ChunkCoord {
            x: origin.x + dx,
            z: origin.z + dz,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (1024 - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RegionChunksIterator {
    fn len(&self) -> usize {
        (1024 - self.current) as usize
    }
}
