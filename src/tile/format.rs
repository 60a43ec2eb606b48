//! Binary tile format: 12-byte header + packed row-major payload, gzipped.
//!
//! Every renderer, image-producing or raw-data-producing, persists through
//! this one codec. The header is:
//!
//! ```text
//! offset 0   4 bytes   magic  b"TTIL"
//! offset 4   4 bytes   format version (u32 LE)
//! offset 8   4 bytes   world floor height (i32 LE)
//! ```
//!
//! followed by 512×512 packed `u32` LE values in row-major order. The
//! whole stream is gzip-compressed on disk.

use super::TileError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Magic bytes at the start of every tile file.
pub const TILE_MAGIC: [u8; 4] = *b"TTIL";

/// Current tile format version.
pub const TILE_FORMAT_VERSION: u32 = 1;

/// Pixels per tile edge at every zoom level.
pub const TILE_EDGE: usize = 512;

/// Total packed values per tile.
pub const TILE_PIXELS: usize = TILE_EDGE * TILE_EDGE;

/// Header length in bytes.
pub const TILE_HEADER_LEN: usize = 12;

/// One decoded tile: header fields plus the packed value grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    /// World floor height carried in the header.
    pub floor: i32,
    /// 512×512 packed values, row-major.
    pub pixels: Vec<u32>,
}

impl TileData {
    /// A tile of fully transparent (zero) values.
    pub fn blank(floor: i32) -> Self {
        Self {
            floor,
            pixels: vec![0; TILE_PIXELS],
        }
    }

    /// Wraps an existing pixel buffer.
    ///
    /// The buffer must hold exactly [`TILE_PIXELS`] values.
    pub fn from_pixels(floor: i32, pixels: Vec<u32>) -> Self {
        debug_assert_eq!(pixels.len(), TILE_PIXELS);
        Self { floor, pixels }
    }

    /// Value at pixel `(x, z)`; both in `0..512`.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> u32 {
        self.pixels[z * TILE_EDGE + x]
    }

    /// Serializes and gzip-compresses this tile.
    pub fn encode(&self) -> Result<Vec<u8>, TileError> {
        let mut raw = Vec::with_capacity(TILE_HEADER_LEN + self.pixels.len() * 4);
        raw.extend_from_slice(&TILE_MAGIC);
        raw.extend_from_slice(&TILE_FORMAT_VERSION.to_le_bytes());
        raw.extend_from_slice(&self.floor.to_le_bytes());
        for value in &self.pixels {
            raw.extend_from_slice(&value.to_le_bytes());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    /// Decompresses and parses a tile, validating magic, version and
    /// payload length.
    pub fn decode(bytes: &[u8]) -> Result<Self, TileError> {
        let mut raw = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut raw)?;

        if raw.len() < TILE_HEADER_LEN {
            return Err(TileError::Truncated {
                expected: TILE_HEADER_LEN,
                actual: raw.len(),
            });
        }
        if raw[0..4] != TILE_MAGIC {
            return Err(TileError::BadMagic);
        }

        let version = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if version != TILE_FORMAT_VERSION {
            return Err(TileError::UnsupportedVersion(version));
        }

        let floor = i32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);

        let payload = &raw[TILE_HEADER_LEN..];
        let expected = TILE_PIXELS * 4;
        if payload.len() != expected {
            return Err(TileError::Truncated {
                expected,
                actual: payload.len(),
            });
        }

        let pixels = payload
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self { floor, pixels })
    }
}
