//! Terrain resources: layers, tree and detail prototypes, and their per-cell data

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::heightmap::check_buffer;
use super::TerrainError;

/// Texture layer painted through the alphamaps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayer {
    pub name: String,
    /// Diffuse texture asset path
    pub diffuse: String,
    /// Normal map asset path
    pub normal_map: Option<String>,
    /// World-space tile size of the texture
    pub tile_size: Vec2,
    pub metallic: f32,
    pub smoothness: f32,
}

impl TerrainLayer {
    pub fn new(name: impl Into<String>, diffuse: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: diffuse.into(),
            normal_map: None,
            tile_size: Vec2::splat(15.0),
            metallic: 0.0,
            smoothness: 0.0,
        }
    }
}

/// Tree species placed by tree instances
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreePrototype {
    pub name: String,
    /// Prefab asset the tree renders with
    pub prefab: String,
    pub bend_factor: f32,
}

impl TreePrototype {
    pub fn new(name: impl Into<String>, prefab: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefab: prefab.into(),
            bend_factor: 0.0,
        }
    }
}

/// One placed tree
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeInstance {
    /// Index into the unit's tree prototypes
    pub prototype_index: usize,
    /// Position normalized to the unit bounds, each axis in [0, 1]
    pub position: Vec3,
    /// Rotation about +Y in radians
    pub rotation: f32,
    pub width_scale: f32,
    pub height_scale: f32,
}

impl TreeInstance {
    pub fn new(prototype_index: usize, position: Vec3) -> Self {
        Self {
            prototype_index,
            position,
            rotation: 0.0,
            width_scale: 1.0,
            height_scale: 1.0,
        }
    }
}

/// How a detail prototype is drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailRenderMode {
    #[default]
    Grass,
    GrassBillboard,
    VertexLit,
}

/// Grass or small mesh scattered by density
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailPrototype {
    pub name: String,
    /// Texture or mesh asset path
    pub source: String,
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub render_mode: DetailRenderMode,
}

impl DetailPrototype {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            min_width: 1.0,
            max_width: 2.0,
            min_height: 1.0,
            max_height: 2.0,
            render_mode: DetailRenderMode::Grass,
        }
    }
}

/// Per-cell detail density, one buffer per detail prototype.
///
/// Buffer index `i` belongs to detail prototype `i`; writes past the
/// current prototype count are rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetailLayers {
    resolution: usize,
    layers: Vec<Vec<u16>>,
}

impl DetailLayers {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            layers: Vec::new(),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Density buffer for a prototype index
    pub fn density(&self, index: usize) -> Result<&[u16], TerrainError> {
        self.layers
            .get(index)
            .map(|l| l.as_slice())
            .ok_or(TerrainError::DetailIndexOutOfRange { index, count: self.layers.len() })
    }

    /// Replace the density buffer for a prototype index
    pub fn set_density(&mut self, index: usize, values: &[u16]) -> Result<(), TerrainError> {
        let expected = self.resolution * self.resolution;
        let count = self.layers.len();
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(TerrainError::DetailIndexOutOfRange { index, count })?;
        if values.len() != expected {
            return Err(TerrainError::BufferSizeMismatch { expected, actual: values.len() });
        }
        layer.copy_from_slice(values);
        Ok(())
    }

    /// Match the buffer count to the prototype count. New buffers start at zero.
    pub(crate) fn resize_layers(&mut self, count: usize) {
        let cells = self.resolution * self.resolution;
        self.layers.resize_with(count, || vec![0; cells]);
    }

    /// Change resolution. Destructive: every buffer is reset to zero.
    pub(crate) fn set_resolution(&mut self, resolution: usize) {
        self.resolution = resolution;
        let count = self.layers.len();
        self.layers = vec![vec![0; resolution * resolution]; count];
    }

    /// One full buffer per detail prototype
    pub(crate) fn check(&self, prototypes: usize) -> Result<(), TerrainError> {
        check_layers(self.resolution, self.layers.iter().map(Vec::len), prototypes)
    }

    /// Sum of all densities
    pub fn total_density(&self) -> u64 {
        self.layers.iter().flatten().map(|&d| d as u64).sum()
    }
}

/// Per-cell splat weights, one buffer per terrain layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alphamaps {
    resolution: usize,
    layers: Vec<Vec<f32>>,
}

impl Alphamaps {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            layers: Vec::new(),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn weights(&self, layer: usize) -> Option<&[f32]> {
        self.layers.get(layer).map(|l| l.as_slice())
    }

    /// One full buffer per terrain layer
    pub(crate) fn check(&self, layers: usize) -> Result<(), TerrainError> {
        check_layers(self.resolution, self.layers.iter().map(Vec::len), layers)
    }

    /// Match the buffer count to the layer count.
    ///
    /// When a unit gains its first layer that layer is fully weighted.
    pub(crate) fn resize_layers(&mut self, count: usize) {
        let cells = self.resolution * self.resolution;
        let was_empty = self.layers.is_empty();
        self.layers.resize_with(count, || vec![0.0; cells]);
        if was_empty {
            if let Some(first) = self.layers.first_mut() {
                first.fill(1.0);
            }
        }
    }

    /// Change resolution. Destructive: the first layer takes full weight again.
    pub(crate) fn set_resolution(&mut self, resolution: usize) {
        let count = self.layers.len();
        self.resolution = resolution;
        self.layers.clear();
        self.resize_layers(count);
    }
}
