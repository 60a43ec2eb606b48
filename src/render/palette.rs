//! Material and biome color assignments.
//!
//! Built once per pipeline and shared read-only by every renderer.
//! Materials or biomes with no assigned color stay unrendered
//! (transparent), which is how "no data" and unknown ids degrade.

use crate::world::{BiomeId, MaterialId};
use std::collections::HashMap;

/// Color pair for one biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiomeColors {
    /// Representative map color.
    pub color: u32,
    /// Coarse categorical overlay color (carries its own alpha).
    pub category: u32,
}

/// Color lookup table for materials and biomes.
#[derive(Debug, Default)]
pub struct Palette {
    materials: HashMap<u16, u32>,
    biomes: HashMap<u16, BiomeColors>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style material color assignment.
    pub fn with_material(mut self, material: MaterialId, color: u32) -> Self {
        self.materials.insert(material.0, color);
        self
    }

    /// Builder-style biome color assignment.
    pub fn with_biome(mut self, biome: BiomeId, color: u32, category: u32) -> Self {
        self.biomes.insert(biome.0, BiomeColors { color, category });
        self
    }

    /// True surface color for a material, if one is assigned.
    pub fn material_color(&self, material: MaterialId) -> Option<u32> {
        self.materials.get(&material.0).copied()
    }

    pub fn biome_color(&self, biome: BiomeId) -> Option<u32> {
        self.biomes.get(&biome.0).map(|b| b.color)
    }

    /// Categorical overlay color for a biome, if one is assigned.
    pub fn biome_category(&self, biome: BiomeId) -> Option<u32> {
        self.biomes.get(&biome.0).map(|b| b.category)
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
