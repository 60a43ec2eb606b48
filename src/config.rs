//! Pipeline configuration.
//!
//! All knobs live in one [`RenderConfig`] struct with sensible
//! defaults; callers construct one, override what they need, and hand
//! it to the processor or a job.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Default number of tile zoom levels in the pyramid (zoom 0 plus two
/// downsampled levels).
pub const DEFAULT_ZOOM_LEVELS: u8 = 3;

/// Default number of concurrent region saves.
pub const DEFAULT_IO_WORKERS: usize = 2;

/// Default interval between background processing cycles.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(10);

/// Default cap on regions rendered per background cycle.
pub const DEFAULT_MAX_REGIONS_PER_CYCLE: usize = 64;

/// Default activity count at which a chunk renders fully "hot".
pub const DEFAULT_MAX_CHUNK_ACTIVITY: u32 = 64;

/// Settings shared by the background processor and one-shot jobs.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Root directory of the tile pyramid.
    pub tiles_dir: PathBuf,
    /// Directory for timestamps and resume state.
    pub state_dir: PathBuf,
    /// Zoom levels in the pyramid, including zoom 0. At most 10;
    /// processor and job constructors reject larger values.
    pub zoom_levels: u8,
    /// Concurrent region renders. Defaults to available parallelism.
    pub render_workers: usize,
    /// Concurrent region saves.
    pub io_workers: usize,
    /// How often the background processor wakes to drain dirty regions.
    pub cycle_interval: Duration,
    /// Most regions a single background cycle will render; the rest
    /// stay queued for the next cycle.
    pub max_regions_per_cycle: usize,
    /// Activity count treated as maximum heat by the activity renderer.
    pub max_chunk_activity: u32,
}

impl RenderConfig {
    /// Config with defaults, rooted at the given tile and state
    /// directories.
    pub fn new(tiles_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            tiles_dir: tiles_dir.into(),
            state_dir: state_dir.into(),
            zoom_levels: DEFAULT_ZOOM_LEVELS,
            render_workers: default_render_workers(),
            io_workers: DEFAULT_IO_WORKERS,
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            max_regions_per_cycle: DEFAULT_MAX_REGIONS_PER_CYCLE,
            max_chunk_activity: DEFAULT_MAX_CHUNK_ACTIVITY,
        }
    }
}

fn default_render_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RenderConfig::new("/tmp/tiles", "/tmp/state");
        assert_eq!(config.zoom_levels, 3);
        assert!(config.render_workers >= 1);
        assert_eq!(config.io_workers, 2);
        assert_eq!(config.cycle_interval, Duration::from_secs(10));
    }
}
