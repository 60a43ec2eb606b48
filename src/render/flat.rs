//! Flat true-color renderer: material color only, no shading.

use super::{PassOutputs, Palette, RenderError, RenderOutput, Renderer};
use crate::world::{RegionSnapshot, Sample};
use std::sync::Arc;

pub const FLAT_RENDERER_ID: &str = "flat";

/// Renders the raw material color of each column with no light shading
/// and no fluid or overlay compositing. The simplest base-renderer
/// variant; also useful as a predictable fixture in end-to-end tests.
pub struct FlatRenderer {
    palette: Arc<Palette>,
}

impl FlatRenderer {
    pub fn new(palette: Arc<Palette>) -> Self {
        Self { palette }
    }
}

impl Renderer for FlatRenderer {
    fn id(&self) -> &'static str {
        FLAT_RENDERER_ID
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
        if let Some(color) = self.palette.material_color(sample.material) {
            out.primary.set(x, z, color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::pack;
    use crate::coord::RegionCoord;
    use crate::world::{BiomeId, MaterialId};

    #[test]
    fn renders_material_color_ignoring_light() {
        let palette = Arc::new(Palette::new().with_material(MaterialId(3), pack(255, 9, 8, 7)));
        let renderer = FlatRenderer::new(palette);
        let snap = RegionSnapshot::new(RegionCoord::new(0, 0));
        let mut out = renderer.allocate(RegionCoord::new(0, 0));
        let pass = PassOutputs::new(&[], &[]);

        let dark = Sample::solid(MaterialId(3), 10, BiomeId(0), 0);
        renderer
            .render_column(&snap, 1, 2, &dark, &mut out, &pass)
            .unwrap();
        assert_eq!(out.primary.get(1, 2), pack(255, 9, 8, 7));
    }
}
