//! Raw block-data export renderer.

use super::{PassOutputs, RenderError, RenderOutput, Renderer};
use crate::tile::Downsample;
use crate::world::{RegionSnapshot, Sample};

pub const DATA_EXPORT_RENDERER_ID: &str = "blockdata";

/// Bit widths of the packed payload (format version 1): material index,
/// biome index, floor-biased height.
const MATERIAL_BITS: u32 = 14;
const BIOME_BITS: u32 = 8;
const HEIGHT_BITS: u32 = 10;

const MATERIAL_MASK: u32 = (1 << MATERIAL_BITS) - 1;
const BIOME_MASK: u32 = (1 << BIOME_BITS) - 1;
const HEIGHT_MASK: u32 = (1 << HEIGHT_BITS) - 1;

/// Packs per-column block data into fixed-width bitfields instead of
/// producing a viewable image.
///
/// The payload is not a color, so zoom-out tiles select one
/// representative column's packed value per block
/// ([`Downsample::PointSample`]) rather than interpolating. Heights are
/// biased by the world floor so negative build heights stay
/// representable in 10 bits.
pub struct DataExportRenderer {
    floor: i32,
}

impl DataExportRenderer {
    pub fn new(floor: i32) -> Self {
        Self { floor }
    }

    /// Packs one column: `material:14 | biome:8 | height:10`, high to low.
    fn pack_column(&self, sample: &Sample) -> u32 {
        let material = sample.material.0 as u32 & MATERIAL_MASK;
        let biome = sample.biome.0 as u32 & BIOME_MASK;
        let height = (sample.height - self.floor).clamp(0, HEIGHT_MASK as i32) as u32;
        (material << (BIOME_BITS + HEIGHT_BITS)) | (biome << HEIGHT_BITS) | height
    }
}

impl Renderer for DataExportRenderer {
    fn id(&self) -> &'static str {
        DATA_EXPORT_RENDERER_ID
    }

    fn downsample(&self) -> Downsample {
        Downsample::PointSample
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
        out.primary.set(x, z, self.pack_column(sample));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BiomeId, MaterialId};

    #[test]
    fn packs_fields_in_declared_layout() {
        let renderer = DataExportRenderer::new(-64);
        let sample = Sample::solid(MaterialId(5), 100, BiomeId(3), 15);
        let packed = renderer.pack_column(&sample);

        assert_eq!(packed >> 18, 5);
        assert_eq!((packed >> 10) & 0xFF, 3);
        assert_eq!(packed & 0x3FF, (100 + 64) as u32);
    }

    #[test]
    fn height_below_floor_clamps_to_zero() {
        let renderer = DataExportRenderer::new(0);
        let sample = Sample::solid(MaterialId(1), -10, BiomeId(0), 0);
        assert_eq!(renderer.pack_column(&sample) & 0x3FF, 0);
    }

    #[test]
    fn height_above_range_clamps_to_max() {
        let renderer = DataExportRenderer::new(0);
        let sample = Sample::solid(MaterialId(1), 5000, BiomeId(0), 0);
        assert_eq!(renderer.pack_column(&sample) & 0x3FF, 1023);
    }

    #[test]
    fn oversized_ids_are_masked() {
        let renderer = DataExportRenderer::new(0);
        let sample = Sample::solid(MaterialId(u16::MAX), 0, BiomeId(300), 0);
        let packed = renderer.pack_column(&sample);
        assert_eq!(packed >> 18, u16::MAX as u32 & 0x3FFF);
        assert_eq!((packed >> 10) & 0xFF, 300 & 0xFF);
    }

    #[test]
    fn uses_point_sample_downsampling() {
        assert_eq!(
            DataExportRenderer::new(0).downsample(),
            Downsample::PointSample
        );
    }
}
