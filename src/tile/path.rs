//! Tile file path construction.

use crate::coord::RegionCoord;
use std::path::{Path, PathBuf};

/// Construct the full path for a tile file.
///
/// Creates a hierarchical path structure:
/// ```text
/// <root>/<renderer_id>/z<zoom>/r.<x>.<z>.ttl
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use terratile::coord::RegionCoord;
/// use terratile::tile::tile_path;
///
/// let root = PathBuf::from("/tiles");
/// let path = tile_path(&root, "surface", 2, RegionCoord::new(-3, 17));
///
/// assert_eq!(path, PathBuf::from("/tiles/surface/z2/r.-3.17.ttl"));
/// ```
pub fn tile_path(root: &Path, renderer_id: &str, zoom: u8, region: RegionCoord) -> PathBuf {
    root.join(renderer_id)
        .join(format!("z{zoom}"))
        .join(format!("r.{}.{}.ttl", region.x, region.z))
}

/// Directory holding all tiles for one renderer at one zoom level.
pub fn zoom_directory(root: &Path, renderer_id: &str, zoom: u8) -> PathBuf {
    root.join(renderer_id).join(format!("z{zoom}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        let p = tile_path(Path::new("/t"), "biome", 0, RegionCoord::new(0, 0));
        assert_eq!(p, PathBuf::from("/t/biome/z0/r.0.0.ttl"));
    }

    #[test]
    fn negative_coordinates_keep_sign() {
        let p = tile_path(Path::new("/t"), "surface", 3, RegionCoord::new(-1, -128));
        assert_eq!(p, PathBuf::from("/t/surface/z3/r.-1.-128.ttl"));
    }

    #[test]
    fn zoom_directory_is_path_prefix() {
        let dir = zoom_directory(Path::new("/t"), "surface", 1);
        let file = tile_path(Path::new("/t"), "surface", 1, RegionCoord::new(4, 5));
        assert!(file.starts_with(&dir));
    }
}
