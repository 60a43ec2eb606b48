//! Tile persistence: binary format, path layout and the pyramid writer.
//!
//! One tile file exists per (renderer id, zoom level, region coordinate).
//! Zoom 0 is native resolution; each higher level halves resolution by
//! folding 2×2 children into one parent tile. The invariant maintained
//! here: a tile at zoom *z* always reflects the most recently saved
//! zoom-0 data that overlaps it; a region's save is complete only after
//! its sub-rectangle has propagated into every configured level.

mod error;
mod format;
mod path;
mod writer;

pub use error::TileError;
pub use format::{
    TileData, TILE_EDGE, TILE_FORMAT_VERSION, TILE_HEADER_LEN, TILE_MAGIC, TILE_PIXELS,
};
pub use path::{tile_path, zoom_directory};
pub use writer::{Downsample, TilePyramidWriter, MAX_ZOOM_LEVELS};
