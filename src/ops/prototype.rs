//! Frozen settings exemplar copied onto other units

use crate::batch::UnitError;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::provider::TerrainUnitProvider;
use crate::terrain::{TerrainSettings, TerrainUnit, UnitId};

/// Owned snapshot of a unit's settings and resolutions.
///
/// Independent of the source unit, so the source may be unloaded or
/// edited while the template is applied. Dropped when the operation that
/// captured it finishes, whatever the run's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PrototypeTemplate {
    source: UnitId,
    settings: TerrainSettings,
    heightmap_resolution: usize,
    detail_resolution: usize,
    alphamap_resolution: usize,
}

impl PrototypeTemplate {
    /// Deep copy of a unit's settings
    pub fn capture(unit: &TerrainUnit) -> Self {
        Self {
            source: unit.id,
            settings: unit.settings.clone(),
            heightmap_resolution: unit.heightmap_resolution(),
            detail_resolution: unit.detail_resolution(),
            alphamap_resolution: unit.alphamap_resolution(),
        }
    }

    /// Load the prototype unit from a provider, snapshot it and release it
    pub fn capture_from(provider: &mut dyn TerrainUnitProvider, id: UnitId) -> Result<Self> {
        let unit = provider
            .load(id)
            .map_err(|e| Error::precondition(format!("prototype unit {} unavailable: {}", id, e)))?;
        let template = Self::capture(unit);
        provider.release_if_transient(id)?;
        log::debug!("Captured prototype template from unit {}", id);
        Ok(template)
    }

    pub fn source(&self) -> UnitId {
        self.source
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn heightmap_resolution(&self) -> usize {
        self.heightmap_resolution
    }

    /// Copy the template's settings onto `unit`.
    ///
    /// Heightmap resolution is only copied when `copy_heightmap_resolution`
    /// is set, since changing it flattens the unit.
    pub fn apply_to(&self, unit: &mut TerrainUnit, copy_heightmap_resolution: bool) -> std::result::Result<(), UnitError> {
        let src = &self.settings;
        let dst = &mut unit.settings;

        // Draw
        dst.draw_heightmap = src.draw_heightmap;
        dst.draw_trees_and_foliage = src.draw_trees_and_foliage;
        dst.draw_instanced = src.draw_instanced;

        // LOD
        dst.pixel_error = src.pixel_error;
        dst.basemap_distance = src.basemap_distance;

        // Shadows and material
        dst.shadow_casting = src.shadow_casting;
        dst.reflection_probe_usage = src.reflection_probe_usage;
        dst.material = src.material.clone();

        // Trees, details and grass wind
        dst.detail_object_distance = src.detail_object_distance;
        dst.detail_object_density = src.detail_object_density;
        dst.tree_distance = src.tree_distance;
        dst.tree_billboard_distance = src.tree_billboard_distance;
        dst.tree_crossfade_length = src.tree_crossfade_length;
        dst.tree_maximum_full_lod_count = src.tree_maximum_full_lod_count;
        dst.grass_wind = src.grass_wind;

        // Mesh resolution
        dst.detail_resolution_per_patch = src.detail_resolution_per_patch;
        unit.set_detail_resolution(self.detail_resolution);

        // Holes
        unit.settings.enable_holes = src.enable_holes;

        // Texture resolution
        unit.settings.basemap_resolution = src.basemap_resolution;
        unit.set_alphamap_resolution(self.alphamap_resolution);

        if copy_heightmap_resolution {
            unit.set_heightmap_resolution(self.heightmap_resolution)?;
        }
        Ok(())
    }
}

impl Drop for PrototypeTemplate {
    fn drop(&mut self) {
        log::debug!("Released prototype template of unit {}", self.source);
    }
}
