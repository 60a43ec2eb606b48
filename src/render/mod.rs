//! Renderer abstraction and the renderer registry.
//!
//! A renderer turns per-column [`Sample`]s into one pixel buffer for a
//! region. Renderers are keyed by a stable id, may declare a dependency
//! on another renderer's already-populated buffer for the same scan pass
//! (composition, e.g. a heatmap over the surface colors), and declare how
//! their tiles downsample into zoom-out parents.
//!
//! The [`RendererSet`] is the explicit registry: constructed once,
//! injected by reference into scan tasks, and responsible for ordering
//! renderers by declared dependency rather than registration order.

mod activity;
mod biome;
mod export;
mod flat;
mod palette;
mod surface;

pub use activity::{ActivityRenderer, ACTIVITY_RENDERER_ID};
pub use biome::{BiomeRenderer, BIOME_RENDERER_ID};
pub use export::{DataExportRenderer, DATA_EXPORT_RENDERER_ID};
pub use flat::{FlatRenderer, FLAT_RENDERER_ID};
pub use palette::{BiomeColors, Palette};
pub use surface::{SurfaceRenderer, LIGHT_SIDE_SUFFIX, SURFACE_RENDERER_ID};

use crate::coord::RegionCoord;
use crate::tile::{Downsample, TILE_EDGE, TILE_PIXELS};
use crate::world::{RegionSnapshot, Sample};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A 512×512 packed-value buffer for one region.
#[derive(Debug, Clone)]
pub struct RenderBuffer {
    pixels: Vec<u32>,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; TILE_PIXELS],
        }
    }

    /// Value at region-local `(x, z)`, both in `0..512`.
    #[inline]
    pub fn get(&self, x: i32, z: i32) -> u32 {
        self.pixels[z as usize * TILE_EDGE + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: i32, z: i32, value: u32) {
        self.pixels[z as usize * TILE_EDGE + x as usize] = value;
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// An auxiliary buffer persisted alongside a renderer's primary tile.
#[derive(Debug)]
pub struct SideBuffer {
    /// Appended to the renderer id to form the tile id
    /// (`<renderer>_<suffix>`).
    pub suffix: &'static str,
    pub buffer: RenderBuffer,
}

/// All buffers one renderer produces for one region-scan pass.
#[derive(Debug, Default)]
pub struct RenderOutput {
    pub primary: RenderBuffer,
    pub sides: Vec<SideBuffer>,
    /// Scan-scoped scratch space (e.g. a shade grid); never persisted.
    pub scratch: Vec<u8>,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Read-only view of the buffers renderers earlier in the pass produced.
pub struct PassOutputs<'a> {
    ids: &'a [&'static str],
    outputs: &'a [RenderOutput],
}

impl<'a> PassOutputs<'a> {
    pub fn new(ids: &'a [&'static str], outputs: &'a [RenderOutput]) -> Self {
        debug_assert_eq!(ids.len(), outputs.len());
        Self { ids, outputs }
    }

    /// Primary buffer of an earlier renderer, by id.
    pub fn buffer(&self, id: &str) -> Option<&'a RenderBuffer> {
        self.ids
            .iter()
            .position(|&i| i == id)
            .map(|i| &self.outputs[i].primary)
    }
}

/// A failure while coloring a single column.
///
/// These never unwind past the scan task: the task records the failure,
/// leaves the pixel transparent and continues with the next column.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("missing dependency buffer '{0}'")]
    MissingDependency(&'static str),

    #[error("{0}")]
    Other(String),
}

/// One colorization strategy.
///
/// Implementations must be stateless across regions (they are shared by
/// concurrent scan tasks); per-region state lives in the [`RenderOutput`]
/// the task allocates.
pub trait Renderer: Send + Sync {
    /// Stable identifier; also the tile directory name.
    fn id(&self) -> &'static str;

    /// Id of a renderer whose finished primary buffer this one reads
    /// during the same pass. The [`RendererSet`] guarantees the
    /// dependency runs earlier.
    fn dependency(&self) -> Option<&'static str> {
        None
    }

    /// How this renderer's tiles reduce into zoom-out parents.
    fn downsample(&self) -> Downsample {
        Downsample::Average
    }

    /// Creates the empty buffer(s) for one region; called once per scan.
    fn allocate(&self, _region: RegionCoord) -> RenderOutput {
        RenderOutput::new()
    }

    /// Optional whole-region pre-pass over the snapshot (e.g. building a
    /// blurred shade grid) before per-column rendering starts.
    fn begin_region(&self, _snapshot: &RegionSnapshot, _out: &mut RenderOutput) {}

    /// Colors one column. `x`/`z` are region-local (`0..512`); border
    /// context is available through the snapshot.
    fn render_column(
        &self,
        snapshot: &RegionSnapshot,
        x: i32,
        z: i32,
        sample: &Sample,
        out: &mut RenderOutput,
        pass: &PassOutputs<'_>,
    ) -> Result<(), RenderError>;
}

/// Errors building a [`RendererSet`].
#[derive(Debug, Error)]
pub enum RendererSetError {
    #[error("duplicate renderer id '{0}'")]
    DuplicateId(String),

    #[error("renderer '{renderer}' depends on unknown renderer '{dependency}'")]
    UnknownDependency { renderer: String, dependency: String },

    #[error("renderer dependency cycle involving '{0}'")]
    DependencyCycle(String),
}

/// The ordered registry of active renderers for one pipeline.
///
/// Construction validates ids and dependencies and fixes the execution
/// order: every renderer runs after the renderer it depends on,
/// regardless of registration order.
pub struct RendererSet {
    renderers: Vec<Arc<dyn Renderer>>,
}

impl fmt::Debug for RendererSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererSet").field("ids", &self.ids()).finish()
    }
}

impl RendererSet {
    pub fn new(renderers: Vec<Arc<dyn Renderer>>) -> Result<Self, RendererSetError> {
        let mut seen = HashSet::new();
        for r in &renderers {
            if !seen.insert(r.id()) {
                return Err(RendererSetError::DuplicateId(r.id().to_string()));
            }
        }
        for r in &renderers {
            if let Some(dep) = r.dependency() {
                if !seen.contains(dep) {
                    return Err(RendererSetError::UnknownDependency {
                        renderer: r.id().to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        // Stable topological order: repeatedly take every renderer whose
        // dependency is already placed, preserving registration order
        // among the ready ones.
        let mut ordered: Vec<Arc<dyn Renderer>> = Vec::with_capacity(renderers.len());
        let mut placed: HashSet<&'static str> = HashSet::new();
        let mut pending = renderers;

        while !pending.is_empty() {
            let before = ordered.len();
            let mut still_pending = Vec::new();
            for r in pending {
                if r.dependency().map_or(true, |d| placed.contains(d)) {
                    placed.insert(r.id());
                    ordered.push(r);
                } else {
                    still_pending.push(r);
                }
            }
            if ordered.len() == before {
                let id = still_pending[0].id().to_string();
                return Err(RendererSetError::DependencyCycle(id));
            }
            pending = still_pending;
        }

        Ok(Self { renderers: ordered })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Renderer>> {
        self.renderers.iter()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Execution-ordered renderer ids.
    pub fn ids(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.id()).collect()
    }
}
