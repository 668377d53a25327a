//! Per-unit draw, LOD, shadow, material and wind settings

use serde::{Deserialize, Serialize};

/// Shadow casting mode for the terrain surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowCastingMode {
    Off,
    #[default]
    On,
    TwoSided,
    ShadowsOnly,
}

/// Reflection probe usage for the terrain surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReflectionProbeUsage {
    Off,
    #[default]
    BlendProbes,
    BlendProbesAndSkybox,
    Simple,
}

/// Grass wind parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrassWind {
    pub speed: f32,
    pub size: f32,
    pub bending: f32,
    /// RGBA tint
    pub tint: [f32; 4],
}

impl Default for GrassWind {
    fn default() -> Self {
        Self {
            speed: 0.5,
            size: 0.5,
            bending: 0.5,
            tint: [0.7, 0.6, 0.5, 1.0],
        }
    }
}

/// Non-destructive unit settings.
///
/// Resolution changes (heightmap, detail, alphamap) wipe data and are
/// handled by `TerrainUnit` directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    // Draw
    pub draw_heightmap: bool,
    pub draw_trees_and_foliage: bool,
    pub draw_instanced: bool,

    // LOD
    pub pixel_error: f32,
    pub basemap_distance: f32,

    // Lighting and material
    pub shadow_casting: ShadowCastingMode,
    pub reflection_probe_usage: ReflectionProbeUsage,
    pub material: Option<String>,

    // Trees and details
    pub detail_object_distance: f32,
    pub detail_object_density: f32,
    pub tree_distance: f32,
    pub tree_billboard_distance: f32,
    pub tree_crossfade_length: f32,
    pub tree_maximum_full_lod_count: u32,
    pub grass_wind: GrassWind,

    // Mesh resolution
    pub detail_resolution_per_patch: u32,

    // Holes
    pub enable_holes: bool,

    // Texture resolution
    pub basemap_resolution: u32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            draw_heightmap: true,
            draw_trees_and_foliage: true,
            draw_instanced: true,
            pixel_error: 5.0,
            basemap_distance: 1000.0,
            shadow_casting: ShadowCastingMode::On,
            reflection_probe_usage: ReflectionProbeUsage::BlendProbes,
            material: None,
            detail_object_distance: 80.0,
            detail_object_density: 1.0,
            tree_distance: 5000.0,
            tree_billboard_distance: 50.0,
            tree_crossfade_length: 5.0,
            tree_maximum_full_lod_count: 50,
            grass_wind: GrassWind::default(),
            detail_resolution_per_patch: 32,
            enable_holes: false,
            basemap_resolution: 1024,
        }
    }
}
