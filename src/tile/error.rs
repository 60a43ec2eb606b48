//! Error types for tile file I/O.

use thiserror::Error;

/// Errors raised while reading or writing tile files.
#[derive(Debug, Error)]
pub enum TileError {
    /// Underlying filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the tile magic bytes.
    #[error("not a tile file (bad magic)")]
    BadMagic,

    /// File uses a format version this build does not understand.
    #[error("unsupported tile format version {0}")]
    UnsupportedVersion(u32),

    /// Payload is shorter or longer than the header promises.
    #[error("truncated tile payload: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Writer configured with more zoom-out levels than a 512-pixel
    /// tile can halve.
    #[error("too many zoom-out levels: {0} (a 512-pixel tile halves at most 9 times)")]
    TooManyZoomLevels(u8),
}
