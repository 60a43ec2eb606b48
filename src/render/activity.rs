//! Time-weighted activity heatmap renderer.

use super::{PassOutputs, Palette, RenderError, RenderOutput, Renderer, SURFACE_RENDERER_ID};
use crate::color;
use crate::coord::CHUNK_SHIFT;
use crate::world::{RegionSnapshot, Sample};
use std::sync::Arc;

pub const ACTIVITY_RENDERER_ID: &str = "activity";

/// Cold end of the heatmap ramp.
const COLD: u32 = color::pack(255, 0, 64, 255);
/// Hot end of the heatmap ramp.
const HOT: u32 = color::pack(255, 255, 32, 0);

/// Overlays a blue→red heat tint over the surface renderer's pixels,
/// scaled by each chunk's accumulated activity metric.
///
/// Declares a dependency on the surface renderer and reuses its already-
/// computed buffer for the pass; when that buffer is missing or empty it
/// falls back to recomputing a flat material color. Tint hue travels the
/// short way around the color wheel (blue through magenta to red) and
/// tint strength grows with activity, clamped at `max_activity`.
pub struct ActivityRenderer {
    palette: Arc<Palette>,
    max_activity: u32,
}

impl ActivityRenderer {
    pub fn new(palette: Arc<Palette>, max_activity: u32) -> Self {
        assert!(max_activity > 0, "max_activity must be positive");
        Self {
            palette,
            max_activity,
        }
    }
}

impl Renderer for ActivityRenderer {
    fn id(&self) -> &'static str {
        ACTIVITY_RENDERER_ID
    }

    fn dependency(&self) -> Option<&'static str> {
        Some(SURFACE_RENDERER_ID)
    }

    fn render_column(
        &self,
        snapshot: &RegionSnapshot,
        x: i32,
        z: i32,
        sample: &Sample,
        out: &mut RenderOutput,
        pass: &PassOutputs<'_>,
    ) -> Result<(), RenderError> {
        let base = match pass.buffer(SURFACE_RENDERER_ID).map(|b| b.get(x, z)) {
            Some(pixel) if pixel != color::TRANSPARENT => pixel,
            // surface buffer absent or unrendered here: recompute a flat
            // fallback so the heat tint still has something to sit on
            _ => match self.palette.material_color(sample.material) {
                Some(c) => c,
                None => return Ok(()),
            },
        };

        let activity = snapshot.chunk_activity(x >> CHUNK_SHIFT, z >> CHUNK_SHIFT);
        if activity == 0 {
            out.primary.set(x, z, base);
            return Ok(());
        }

        let t = activity.min(self.max_activity) as f32 / self.max_activity as f32;
        let tint = color::lerp_hsb(COLD, HOT, t, true);
        let strength = (48.0 + 144.0 * t) as u8;
        out.primary
            .set(x, z, color::blend(color::with_alpha(tint, strength), base));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{blue, pack, red};
    use crate::coord::RegionCoord;
    use crate::render::RenderBuffer;
    use crate::world::{BiomeId, MaterialId};

    const STONE: MaterialId = MaterialId(1);
    const GRAY: u32 = pack(255, 128, 128, 128);

    fn palette() -> Arc<Palette> {
        Arc::new(Palette::new().with_material(STONE, GRAY))
    }

    fn surface_pass(pixel: u32) -> (Vec<&'static str>, Vec<RenderOutput>) {
        let mut surface_out = RenderOutput::new();
        let mut buf = RenderBuffer::new();
        for z in 0..16 {
            for x in 0..16 {
                buf.set(x, z, pixel);
            }
        }
        surface_out.primary = buf;
        (vec![SURFACE_RENDERER_ID], vec![surface_out])
    }

    fn render(activity: u32, surface_pixel: Option<u32>) -> u32 {
        let renderer = ActivityRenderer::new(palette(), 100);
        let mut snap = RegionSnapshot::new(RegionCoord::new(0, 0));
        snap.set_chunk_activity(0, 0, activity);
        let sample = Sample::solid(STONE, 64, BiomeId(0), 15);
        let mut out = renderer.allocate(RegionCoord::new(0, 0));

        let (ids, outputs) = match surface_pixel {
            Some(p) => surface_pass(p),
            None => (vec![], vec![]),
        };
        let pass = PassOutputs::new(&ids, &outputs);
        renderer
            .render_column(&snap, 3, 3, &sample, &mut out, &pass)
            .unwrap();
        out.primary.get(3, 3)
    }

    #[test]
    fn zero_activity_passes_surface_pixel_through() {
        let surface = pack(255, 10, 20, 30);
        assert_eq!(render(0, Some(surface)), surface);
    }

    #[test]
    fn low_activity_tints_toward_blue() {
        let pixel = render(5, Some(GRAY));
        assert!(blue(pixel) > red(pixel));
    }

    #[test]
    fn max_activity_tints_toward_red() {
        let pixel = render(100, Some(GRAY));
        assert!(red(pixel) > blue(pixel));
    }

    #[test]
    fn activity_above_max_is_clamped() {
        assert_eq!(render(100, Some(GRAY)), render(5000, Some(GRAY)));
    }

    #[test]
    fn missing_surface_buffer_falls_back_to_flat_color() {
        // no surface pass at all: base comes from the palette
        assert_eq!(render(0, None), GRAY);
    }

    #[test]
    fn declares_surface_dependency() {
        let renderer = ActivityRenderer::new(palette(), 100);
        assert_eq!(renderer.dependency(), Some(SURFACE_RENDERER_ID));
    }
}
