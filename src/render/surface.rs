//! True-color surface renderer.

use super::{PassOutputs, Palette, RenderError, RenderOutput, Renderer, SideBuffer};
use crate::color;
use crate::coord::RegionCoord;
use crate::world::{RegionSnapshot, Sample};
use std::sync::Arc;

pub const SURFACE_RENDERER_ID: &str = "surface";

/// Suffix of the light-level side buffer (`surface_light` tiles).
pub const LIGHT_SIDE_SUFFIX: &str = "light";

/// Strongest darkening applied at light level 0.
const MAX_SHADE: f32 = 0.6;

/// Renders the true surface color of each column.
///
/// The material color is darkened by the ambient light level above the
/// surface, blended with the fluid color by depth (shallow fluid shows
/// more of the bottom than deep fluid) and finally composited with any
/// accumulated translucent overlays. Also emits a grayscale light-level
/// side buffer.
pub struct SurfaceRenderer {
    palette: Arc<Palette>,
}

impl SurfaceRenderer {
    pub fn new(palette: Arc<Palette>) -> Self {
        Self { palette }
    }
}

/// Darkens a color toward black as the light level drops.
fn shade_by_light(color: u32, light: u8) -> u32 {
    let light = light.min(15);
    let t = (15 - light) as f32 / 15.0 * MAX_SHADE;
    color::lerp(color, color::with_alpha(0, color::alpha(color)), t)
}

/// Fluid cover alpha by depth: shallow fluid stays translucent, deep
/// fluid approaches opaque.
fn fluid_alpha(depth: u8) -> u8 {
    let a = 0x50u32 + depth as u32 * 0x14;
    a.min(0xF0) as u8
}

impl Renderer for SurfaceRenderer {
    fn id(&self) -> &'static str {
        SURFACE_RENDERER_ID
    }

    fn allocate(&self, _region: RegionCoord) -> RenderOutput {
        let mut out = RenderOutput::new();
        out.sides.push(SideBuffer {
            suffix: LIGHT_SIDE_SUFFIX,
            buffer: super::RenderBuffer::new(),
        });
        out
    }

    fn render_column(
        &self,
        _snapshot: &RegionSnapshot,
        x: i32,
        z: i32,
        sample: &Sample,
        out: &mut RenderOutput,
        _pass: &PassOutputs<'_>,
    ) -> Result<(), RenderError> {
        let Some(base) = self.palette.material_color(sample.material) else {
            return Ok(());
        };

        let mut pixel = shade_by_light(base, sample.light);

        if let Some(fluid) = sample.fluid {
            if let Some(fluid_color) = self.palette.material_color(fluid.material) {
                let cover = color::with_alpha(fluid_color, fluid_alpha(fluid.depth));
                pixel = color::blend(cover, pixel);
            }
        }

        // Overlays are recorded topmost-first; composite bottom-up so the
        // topmost layer ends up in front.
        for &overlay in sample.overlays.iter().rev() {
            pixel = color::blend(overlay, pixel);
        }

        out.primary.set(x, z, pixel);

        let level = (sample.light.min(15) as u32 * 17) as u8;
        out.sides[0].buffer.set(x, z, color::pack(255, level, level, level));
        Ok(())
    }
}
