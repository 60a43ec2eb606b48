//! Coordinate scales and conversions.
//!
//! Three integer scales address the world grid: *columns* (the unit),
//! *chunks* (16 columns per edge) and *regions* (32 chunks = 512 columns
//! per edge). All conversions between scales are exact integer shifts with
//! floor semantics, so a column maps to exactly one chunk and one region
//! for negative coordinates too.

mod types;

pub use types::{
    ChunkCoord, ColumnCoord, RegionChunksIterator, RegionCoord, CHUNK_COLUMNS, CHUNK_SHIFT,
    REGION_CHUNKS, REGION_CHUNK_SHIFT, REGION_COLUMNS, REGION_COLUMN_SHIFT,
};
