//! Zoom-pyramid tile writer.
//!
//! Writes a freshly scanned region's buffer at zoom 0 and folds it into
//! every configured zoom-out level by rewriting only the sub-rectangle of
//! the parent tile that this child covers. Sibling children of the same
//! parent may save concurrently from different workers, so each parent
//! file's read-modify-write runs under a per-path write lock; the lock
//! covers exactly one file, never the whole save.

use super::format::{TileData, TILE_EDGE, TILE_PIXELS};
use super::path::tile_path;
use super::TileError;
use crate::coord::RegionCoord;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// How a renderer's tile is reduced when folded into a zoom-out parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downsample {
    /// Per-channel ARGB average of each child block (image tiles).
    Average,
    /// One representative value per child block (raw-data tiles, whose
    /// payload is not a color and must never be interpolated).
    PointSample,
}

/// Most zoom-out levels a pyramid can carry; a 512-pixel tile halves at
/// most this many times.
pub const MAX_ZOOM_LEVELS: u8 = 9;

/// Persists pixel buffers as a multi-zoom tile pyramid on disk.
pub struct TilePyramidWriter {
    root: PathBuf,
    /// Zoom-out levels beyond native resolution (level 0).
    zoom_levels: u8,
    /// World floor height stamped into every tile header.
    floor: i32,
    /// Per-file read-write locks, keyed by tile path.
    locks: DashMap<PathBuf, Arc<RwLock<()>>>,
}

impl TilePyramidWriter {
    /// Creates a writer rooted at `root`, creating the directory if
    /// needed.
    ///
    /// `zoom_levels` is the number of zoom-out levels beyond zoom 0;
    /// more than [`MAX_ZOOM_LEVELS`] is rejected.
    pub fn new(root: impl Into<PathBuf>, zoom_levels: u8, floor: i32) -> Result<Self, TileError> {
        if zoom_levels > MAX_ZOOM_LEVELS {
            return Err(TileError::TooManyZoomLevels(zoom_levels));
        }
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            zoom_levels,
            floor,
            locks: DashMap::new(),
        })
    }

    /// Root directory of the pyramid.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configured zoom-out level count.
    pub fn zoom_levels(&self) -> u8 {
        self.zoom_levels
    }

    fn file_lock(&self, path: &Path) -> Arc<RwLock<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Saves one renderer's buffer for one region at zoom 0 and updates
    /// every zoom-out parent.
    ///
    /// The zoom-0 write happens first and atomically (temp file + rename).
    /// A failure at one zoom-out level is logged and does not stop the
    /// remaining levels; the first error is still returned so the caller
    /// treats the region as not-yet-rendered and retries later.
    pub fn save(
        &self,
        renderer_id: &str,
        mode: Downsample,
        region: RegionCoord,
        pixels: &[u32],
    ) -> Result<(), TileError> {
        debug_assert_eq!(pixels.len(), TILE_PIXELS);

        self.write_zoom0(renderer_id, region, pixels)?;

        let mut first_err = None;
        for zoom in 1..=self.zoom_levels {
            if let Err(err) = self.update_parent(renderer_id, zoom, region, pixels, mode) {
                warn!(
                    renderer = renderer_id,
                    %region,
                    zoom,
                    error = %err,
                    "zoom-out tile update failed"
                );
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Reads a tile back, `Ok(None)` when the file does not exist.
    pub fn read(
        &self,
        renderer_id: &str,
        zoom: u8,
        region: RegionCoord,
    ) -> Result<Option<TileData>, TileError> {
        let path = tile_path(&self.root, renderer_id, zoom, region);
        let lock = self.file_lock(&path);
        let _guard = lock.read();
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(TileData::decode(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_zoom0(
        &self,
        renderer_id: &str,
        region: RegionCoord,
        pixels: &[u32],
    ) -> Result<(), TileError> {
        let path = tile_path(&self.root, renderer_id, 0, region);
        let tile = TileData::from_pixels(self.floor, pixels.to_vec());
        let bytes = tile.encode()?;

        let lock = self.file_lock(&path);
        let _guard = lock.write();
        atomic_write(&path, &bytes)?;
        Ok(())
    }

    /// Folds the child buffer into its parent tile at one zoom-out level.
    ///
    /// Only the child's sub-rectangle is touched; the rest of the parent
    /// is whatever the most recent sibling write left there. The write
    /// lock is held around this one file's read-modify-write only.
    fn update_parent(
        &self,
        renderer_id: &str,
        zoom: u8,
        region: RegionCoord,
        pixels: &[u32],
        mode: Downsample,
    ) -> Result<(), TileError> {
        let parent = region.zoom_parent(zoom);
        let (ox, oz) = region.zoom_offset(zoom);
        let factor = 1usize << zoom;
        let sub_edge = TILE_EDGE >> zoom;

        let path = tile_path(&self.root, renderer_id, zoom, parent);

        let lock = self.file_lock(&path);
        let _guard = lock.write();

        let mut tile = match fs::read(&path) {
            Ok(bytes) => match TileData::decode(&bytes) {
                Ok(tile) => tile,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "corrupt parent tile, rebuilding from blank");
                    TileData::blank(self.floor)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => TileData::blank(self.floor),
            Err(err) => return Err(err.into()),
        };

        let x0 = ox as usize * sub_edge;
        let z0 = oz as usize * sub_edge;
        for pz in 0..sub_edge {
            for px in 0..sub_edge {
                let value = downsample_block(pixels, px * factor, pz * factor, factor, mode);
                tile.pixels[(z0 + pz) * TILE_EDGE + (x0 + px)] = value;
            }
        }

        let bytes = tile.encode()?;
        atomic_write(&path, &bytes)?;
        Ok(())
    }
}

/// Reduces one `factor`×`factor` block of a zoom-0 buffer to one value.
fn downsample_block(pixels: &[u32], x0: usize, z0: usize, factor: usize, mode: Downsample) -> u32 {
    match mode {
        Downsample::PointSample => pixels[z0 * TILE_EDGE + x0],
        Downsample::Average => {
            let mut a = 0u32;
            let mut r = 0u32;
            let mut g = 0u32;
            let mut b = 0u32;
            for dz in 0..factor {
                for dx in 0..factor {
                    let c = pixels[(z0 + dz) * TILE_EDGE + (x0 + dx)];
                    a += c >> 24;
                    r += (c >> 16) & 0xFF;
                    g += (c >> 8) & 0xFF;
                    b += c & 0xFF;
                }
            }
            let n = (factor * factor) as u32;
            crate::color::pack(
                (a / n) as u8,
                (r / n) as u8,
                (g / n) as u8,
                (b / n) as u8,
            )
        }
    }
}

/// Write-then-rename so readers never observe a half-written tile.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), TileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("ttl.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
