//! Terrain units: heightmaps, settings and resources

pub mod heightmap;
pub mod settings;
pub mod resources;
pub mod unit;
pub mod generator;

pub use heightmap::Heightmap;
pub use settings::{GrassWind, ReflectionProbeUsage, ShadowCastingMode, TerrainSettings};
pub use resources::{
    Alphamaps, DetailLayers, DetailPrototype, DetailRenderMode, TerrainLayer, TreeInstance,
    TreePrototype,
};
pub use unit::{TerrainUnit, UnitId};
pub use generator::{TerrainGenerator, TerrainParams};

use thiserror::Error;

/// Data-model violations on a terrain unit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("Heightmap resolution {0} is not 2^n + 1 within 33..=4097")]
    InvalidResolution(usize),

    #[error("Sample ({x}, {z}) outside heightmap of resolution {resolution}")]
    OutOfBounds { x: usize, z: usize, resolution: usize },

    #[error("Buffer has {actual} values, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Detail layer index {index} out of range ({count} prototypes)")]
    DetailIndexOutOfRange { index: usize, count: usize },

    #[error("Tree prototype index {index} out of range ({count} prototypes)")]
    TreePrototypeOutOfRange { index: usize, count: usize },
}
