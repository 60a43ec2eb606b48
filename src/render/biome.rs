//! Categorical biome overlay renderer.

use super::{PassOutputs, Palette, RenderError, RenderOutput, Renderer};
use crate::color;
use crate::world::{RegionSnapshot, Sample, SNAPSHOT_BORDER, SNAPSHOT_EDGE};
use std::sync::Arc;

pub const BIOME_RENDERER_ID: &str = "biome";

/// Neutral shade value for flat terrain.
const FLAT_SHADE: i32 = 128;

/// Shade delta per block of elevation difference.
const SHADE_STEP: i32 = 8;

/// Renders a coarse categorical color per biome, alpha-blended over a
/// precomputed elevation-shading layer, ignoring true material colors.
///
/// The shade layer is built once per region in [`Renderer::begin_region`]
/// from height differences against the north-west neighbor, then box-
/// blurred so slopes shade smoothly. The biome category color itself is
/// averaged with the 3×3 column neighborhood (reaching into the snapshot
/// border at region edges) to soften biome boundaries. Columns whose
/// material has no assigned color are left unrendered.
pub struct BiomeRenderer {
    palette: Arc<Palette>,
    blur_radius: usize,
}

impl BiomeRenderer {
    pub fn new(palette: Arc<Palette>) -> Self {
        Self {
            palette,
            blur_radius: 2,
        }
    }

    pub fn with_blur_radius(mut self, radius: usize) -> Self {
        self.blur_radius = radius;
        self
    }

    #[inline]
    fn shade_index(x: i32, z: i32) -> usize {
        let row = (z + SNAPSHOT_BORDER) as usize;
        let col = (x + SNAPSHOT_BORDER) as usize;
        row * SNAPSHOT_EDGE as usize + col
    }

    /// Averages the category colors of the 3×3 neighborhood around a
    /// column; neighbors without data fall back to the center biome.
    fn averaged_category(&self, snapshot: &RegionSnapshot, x: i32, z: i32, center: u32) -> u32 {
        let mut r = 0u32;
        let mut g = 0u32;
        let mut b = 0u32;
        let mut n = 0u32;
        for dz in -1..=1 {
            for dx in -1..=1 {
                let neighbor = snapshot
                    .sample(x + dx, z + dz)
                    .and_then(|s| self.palette.biome_category(s.biome))
                    .unwrap_or(center);
                r += color::red(neighbor) as u32;
                g += color::green(neighbor) as u32;
                b += color::blue(neighbor) as u32;
                n += 1;
            }
        }
        color::pack(
            color::alpha(center),
            (r / n) as u8,
            (g / n) as u8,
            (b / n) as u8,
        )
    }
}

impl Renderer for BiomeRenderer {
    fn id(&self) -> &'static str {
        BIOME_RENDERER_ID
    }

    fn begin_region(&self, snapshot: &RegionSnapshot, out: &mut RenderOutput) {
        let edge = SNAPSHOT_EDGE as usize;
        let mut shade = vec![FLAT_SHADE as u8; edge * edge];

        for z in -SNAPSHOT_BORDER..SNAPSHOT_EDGE - SNAPSHOT_BORDER {
            for x in -SNAPSHOT_BORDER..SNAPSHOT_EDGE - SNAPSHOT_BORDER {
                let Some(sample) = snapshot.sample(x, z) else {
                    continue;
                };
                let reference = snapshot
                    .sample(x - 1, z - 1)
                    .map_or(sample.height, |s| s.height);
                let delta = sample.height - reference;
                shade[Self::shade_index(x, z)] =
                    (FLAT_SHADE + delta * SHADE_STEP).clamp(0, 255) as u8;
            }
        }

        color::box_blur(&mut shade, edge, edge, self.blur_radius);
        out.scratch = shade;
    }

    fn render_column(
        &self,
        snapshot: &RegionSnapshot,
        x: i32,
        z: i32,
        sample: &Sample,
        out: &mut RenderOutput,
        _pass: &PassOutputs<'_>,
    ) -> Result<(), RenderError> {
        if self.palette.material_color(sample.material).is_none() {
            return Ok(());
        }
        let Some(category) = self.palette.biome_category(sample.biome) else {
            return Ok(());
        };

        let shade = out
            .scratch
            .get(Self::shade_index(x, z))
            .copied()
            .unwrap_or(FLAT_SHADE as u8);
        let base = color::pack(255, shade, shade, shade);
        let overlay = self.averaged_category(snapshot, x, z, category);
        out.primary.set(x, z, color::blend(overlay, base));
        Ok(())
    }
}
