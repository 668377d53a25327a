//! Noise-based authoring of sample terrain units

use std::sync::Arc;

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::resources::{DetailPrototype, TerrainLayer, TreeInstance, TreePrototype};
use super::unit::{TerrainUnit, UnitId};
use super::TerrainError;

/// Parameters controlling terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
    pub trees_per_unit: usize,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            trees_per_unit: 32,
        }
    }
}

/// Procedural terrain generator using fractal Brownian motion (FBM)
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given parameters
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    /// Get terrain parameters
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Normalized height in [0, 1] at world position (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let nx = (x / self.params.scale) as f64;
        let nz = (z / self.params.scale) as f64;

        // Noise is in [-1, 1]
        let noise_value = self.noise.get([nx, nz]);
        (((noise_value + 1.0) / 2.0) as f32).clamp(0.0, 1.0)
    }

    /// Fill a unit's heightmap from world-space noise so neighbours line up
    pub fn fill_heightmap(&self, unit: &mut TerrainUnit) -> Result<(), TerrainError> {
        let res = unit.heightmap_resolution();
        let step_x = unit.size.x / (res - 1) as f32;
        let step_z = unit.size.z / (res - 1) as f32;
        let origin = unit.position;

        let samples: Vec<f32> = (0..res * res)
            .map(|i| {
                let x = origin.x + (i % res) as f32 * step_x;
                let z = origin.z + (i / res) as f32 * step_z;
                self.height_at(x, z)
            })
            .collect();

        unit.heightmap_mut().set_block(0, 0, res, res, &samples)
    }

    /// Scatter trees deterministically over a unit, seated on its heightmap
    pub fn scatter_trees(&self, unit: &mut TerrainUnit, count: usize) -> Result<(), TerrainError> {
        let prototypes = unit.tree_prototypes().len();
        if prototypes == 0 || count == 0 {
            return Ok(());
        }

        let res = unit.heightmap_resolution();
        let seed = self.params.seed.wrapping_add(unit.id.0.wrapping_mul(7919));
        for i in 0..count as i32 {
            let fx = hash_2d(i, 0, seed);
            let fz = hash_2d(i, 1, seed);
            let gx = (fx * (res - 1) as f32).round() as usize;
            let gz = (fz * (res - 1) as f32).round() as usize;
            let fy = unit.heightmap().get(gx, gz).unwrap_or(0.0);

            let mut tree = TreeInstance::new(i as usize % prototypes, Vec3::new(fx, fy, fz));
            tree.rotation = hash_2d(i, 2, seed) * std::f32::consts::TAU;
            let scale = 0.8 + hash_2d(i, 3, seed) * 0.4;
            tree.width_scale = scale;
            tree.height_scale = scale;
            unit.add_tree(tree)?;
        }
        Ok(())
    }

    /// Build a fully populated sample unit
    pub fn build_unit(
        &self,
        id: UnitId,
        position: Vec3,
        size: Vec3,
        heightmap_resolution: usize,
    ) -> Result<TerrainUnit, TerrainError> {
        let mut unit = TerrainUnit::new(id, format!("Terrain {}", id.0), size, heightmap_resolution)?
            .with_position(position);

        self.fill_heightmap(&mut unit)?;
        unit.set_layers(Arc::from(default_layers()));
        unit.set_tree_prototypes(Arc::from(default_tree_prototypes()));
        unit.set_detail_prototypes(Arc::from(default_detail_prototypes()));
        self.scatter_trees(&mut unit, self.params.trees_per_unit)?;

        let res = unit.detail_resolution();
        let density: Vec<u16> = (0..res * res)
            .map(|i| (hash_2d(i as i32, id.0 as i32, self.params.seed) * 4.0) as u16)
            .collect();
        unit.set_detail_density(0, &density)?;

        Ok(unit)
    }
}

/// Integer hash producing a value in [0, 1].
fn hash_2d(ix: i32, iz: i32, seed: u32) -> f32 {
    let mut h = (ix as u32).wrapping_mul(374761393)
        .wrapping_add((iz as u32).wrapping_mul(668265263))
        .wrapping_add(seed.wrapping_mul(1274126177));
    h = (h ^ (h >> 13)).wrapping_mul(1103515245);
    h = h ^ (h >> 16);
    (h & 0x7FFFFFFF) as f32 / 0x7FFFFFFF_u32 as f32
}

fn default_layers() -> Vec<TerrainLayer> {
    vec![
        TerrainLayer::new("Grass", "textures/grass_diffuse.png"),
        TerrainLayer::new("Rock", "textures/rock_diffuse.png"),
    ]
}

fn default_tree_prototypes() -> Vec<TreePrototype> {
    vec![
        TreePrototype::new("Oak", "prefabs/oak.prefab"),
        TreePrototype::new("Pine", "prefabs/pine.prefab"),
    ]
}

fn default_detail_prototypes() -> Vec<DetailPrototype> {
    vec![DetailPrototype::new("Meadow Grass", "textures/meadow_grass.png")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_params_default() {
        let params = TerrainParams::default();
        assert_eq!(params.seed, 12345);
        assert_eq!(params.scale, 100.0);
        assert_eq!(params.octaves, 4);
        assert_eq!(params.persistence, 0.5);
        assert_eq!(params.lacunarity, 2.0);
    }

    #[test]
    fn test_height_at_in_range_and_stable() {
        let generator = TerrainGenerator::new(TerrainParams::default());
        for (x, z) in [(0.0, 0.0), (50.0, 50.0), (100.0, 100.0), (-50.0, -50.0)] {
            let h1 = generator.height_at(x, z);
            let h2 = generator.height_at(x, z);
            assert!((0.0..=1.0).contains(&h1));
            assert_eq!(h1, h2, "Height should be consistent at ({}, {})", x, z);
        }
    }

    #[test]
    fn test_different_seeds() {
        let gen1 = TerrainGenerator::new(TerrainParams { seed: 1, ..Default::default() });
        let gen2 = TerrainGenerator::new(TerrainParams { seed: 2, ..Default::default() });
        assert_ne!(gen1.height_at(50.3, 50.7), gen2.height_at(50.3, 50.7));
    }

    #[test]
    fn test_hash_range() {
        for i in 0..100 {
            let h = hash_2d(i, -i, 42);
            assert!((0.0..=1.0).contains(&h));
        }
    }

    #[test]
    fn test_build_unit_populated() {
        let generator = TerrainGenerator::new(TerrainParams { trees_per_unit: 10, ..Default::default() });
        let unit = generator
            .build_unit(UnitId(3), Vec3::new(200.0, 0.0, 0.0), Vec3::new(200.0, 60.0, 200.0), 33)
            .unwrap();

        assert_eq!(unit.tree_count(), 10);
        assert_eq!(unit.layers().len(), 2);
        assert_eq!(unit.detail_prototypes().len(), 1);
        assert!(unit.trees().iter().all(|t| t.prototype_index < 2));
        let (lo, hi) = unit.heightmap().min_max();
        assert!(lo >= 0.0 && hi <= 1.0);
    }
}
