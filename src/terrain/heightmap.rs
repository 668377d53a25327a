//! Square heightmap of normalized samples

use serde::{Deserialize, Serialize};

use super::TerrainError;

/// Smallest supported heightmap resolution
pub const MIN_HEIGHTMAP_RESOLUTION: usize = 33;
/// Largest supported heightmap resolution
pub const MAX_HEIGHTMAP_RESOLUTION: usize = 4097;

/// Square grid of height samples in [0, 1], row-major (z rows, x columns).
///
/// A sample of 1.0 maps to the owning unit's full vertical size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heightmap {
    resolution: usize,
    samples: Vec<f32>,
}

pub(crate) fn check_buffer(resolution: usize, actual: usize) -> Result<(), TerrainError> {
    let expected = resolution * resolution;
    if actual != expected {
        return Err(TerrainError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}

impl Heightmap {
    /// Create a flat heightmap at the given resolution
    pub fn new(resolution: usize) -> Result<Self, TerrainError> {
        Self::validate_resolution(resolution)?;
        Ok(Self {
            resolution,
            samples: vec![0.0; resolution * resolution],
        })
    }

    /// Resolution must be `2^n + 1` within the supported range.
    pub fn validate_resolution(resolution: usize) -> Result<(), TerrainError> {
        let in_range = (MIN_HEIGHTMAP_RESOLUTION..=MAX_HEIGHTMAP_RESOLUTION).contains(&resolution);
        if !in_range || !(resolution - 1).is_power_of_two() {
            return Err(TerrainError::InvalidResolution(resolution));
        }
        Ok(())
    }

    /// Valid resolution and one sample per cell
    pub(crate) fn check(&self) -> Result<(), TerrainError> {
        Self::validate_resolution(self.resolution)?;
        check_buffer(self.resolution, self.samples.len())
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Number of samples (`resolution^2`)
    pub fn cell_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample at (x, z), or None when out of bounds
    pub fn get(&self, x: usize, z: usize) -> Option<f32> {
        if x < self.resolution && z < self.resolution {
            Some(self.samples[z * self.resolution + x])
        } else {
            None
        }
    }

    /// Write one sample, clamped to [0, 1]
    pub fn set(&mut self, x: usize, z: usize, value: f32) -> Result<(), TerrainError> {
        if x >= self.resolution || z >= self.resolution {
            return Err(TerrainError::OutOfBounds { x, z, resolution: self.resolution });
        }
        self.samples[z * self.resolution + x] = value.clamp(0.0, 1.0);
        Ok(())
    }

    /// Change resolution. Destructive: every sample is reset to zero.
    pub fn set_resolution(&mut self, resolution: usize) -> Result<(), TerrainError> {
        Self::validate_resolution(resolution)?;
        self.resolution = resolution;
        self.samples = vec![0.0; resolution * resolution];
        Ok(())
    }

    /// Write a `width x height` block of samples starting at (x0, z0).
    pub fn set_block(
        &mut self,
        x0: usize,
        z0: usize,
        width: usize,
        height: usize,
        values: &[f32],
    ) -> Result<(), TerrainError> {
        if values.len() != width * height {
            return Err(TerrainError::BufferSizeMismatch {
                expected: width * height,
                actual: values.len(),
            });
        }
        if x0 + width > self.resolution || z0 + height > self.resolution {
            return Err(TerrainError::OutOfBounds {
                x: x0 + width,
                z: z0 + height,
                resolution: self.resolution,
            });
        }

        for row in 0..height {
            let dst = (z0 + row) * self.resolution + x0;
            let src = row * width;
            self.samples[dst..dst + width].copy_from_slice(&values[src..src + width]);
        }
        Ok(())
    }

    /// (min, max) sample values
    pub fn min_max(&self) -> (f32, f32) {
        self.samples.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
            (lo.min(h), hi.max(h))
        })
    }
}
