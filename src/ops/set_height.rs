//! Flatten units to a uniform world height

use crate::batch::UnitError;
use crate::terrain::TerrainUnit;

/// Uniform heightmap buffer reused across the units of one run.
///
/// The allocation is rebuilt only when the cell count changes; when it
/// matches but the normalized height differs (a unit with another vertical
/// size), the buffer is refilled in place.
#[derive(Debug, Default)]
pub struct HeightBuffer {
    values: Vec<f32>,
    fill: f32,
    rebuilds: usize,
    refills: usize,
}

impl HeightBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `height` is in world units above the unit's origin
    pub fn normalized(unit: &TerrainUnit, height: f32) -> f32 {
        if unit.size.y <= 0.0 {
            return 0.0;
        }
        (height / unit.size.y).clamp(0.0, 1.0)
    }

    /// Set every sample of `unit` to `height`
    pub fn apply(&mut self, unit: &mut TerrainUnit, height: f32) -> Result<(), UnitError> {
        let value = Self::normalized(unit, height);
        let res = unit.heightmap_resolution();
        let cells = res * res;

        if self.values.len() != cells {
            self.values = vec![value; cells];
            self.fill = value;
            self.rebuilds += 1;
        } else if self.fill != value {
            self.values.fill(value);
            self.fill = value;
            self.refills += 1;
        }

        unit.heightmap_mut().set_block(0, 0, res, res, &self.values)?;
        Ok(())
    }

    /// Times the buffer was reallocated
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Times the buffer was refilled without reallocating
    pub fn refills(&self) -> usize {
        self.refills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::UnitId;
    use glam::Vec3;

    fn unit(id: u32, vertical: f32, res: usize) -> TerrainUnit {
        TerrainUnit::new(UnitId(id), "t", Vec3::new(100.0, vertical, 100.0), res).unwrap()
    }

    #[test]
    fn test_apply_is_idempotent() {
        for height in [0.0, 12.5, 50.0, 100.0] {
            let mut u = unit(1, 100.0, 33);
            let mut buffer = HeightBuffer::new();

            buffer.apply(&mut u, height).unwrap();
            let once = u.heightmap().clone();
            buffer.apply(&mut u, height).unwrap();
            assert_eq!(u.heightmap(), &once, "height {}", height);

            let mut fresh = HeightBuffer::new();
            fresh.apply(&mut u, height).unwrap();
            assert_eq!(u.heightmap(), &once);
        }
    }

    #[test]
    fn test_normalizes_against_vertical_size() {
        let mut u = unit(1, 200.0, 33);
        HeightBuffer::new().apply(&mut u, 50.0).unwrap();
        assert_eq!(u.heightmap().min_max(), (0.25, 0.25));
        assert_eq!(u.world_height(16, 16), Some(50.0));
    }

    #[test]
    fn test_clamps_out_of_range() {
        let mut u = unit(1, 100.0, 33);
        let mut buffer = HeightBuffer::new();
        buffer.apply(&mut u, 500.0).unwrap();
        assert_eq!(u.heightmap().min_max(), (1.0, 1.0));
        buffer.apply(&mut u, -5.0).unwrap();
        assert_eq!(u.heightmap().min_max(), (0.0, 0.0));
    }

    #[test]
    fn test_reuses_buffer_at_same_resolution() {
        let mut buffer = HeightBuffer::new();
        let mut a = unit(1, 100.0, 33);
        let mut b = unit(2, 100.0, 33);
        let mut c = unit(3, 100.0, 65);

        buffer.apply(&mut a, 40.0).unwrap();
        buffer.apply(&mut b, 40.0).unwrap();
        assert_eq!(buffer.rebuilds(), 1);

        buffer.apply(&mut c, 40.0).unwrap();
        assert_eq!(buffer.rebuilds(), 2);
        assert_eq!(c.heightmap().min_max(), (0.4, 0.4));
    }

    #[test]
    fn test_refills_for_different_vertical_size() {
        let mut buffer = HeightBuffer::new();
        let mut short = unit(1, 100.0, 33);
        let mut tall = unit(2, 400.0, 33);

        buffer.apply(&mut short, 40.0).unwrap();
        buffer.apply(&mut tall, 40.0).unwrap();

        assert_eq!(buffer.rebuilds(), 1);
        assert_eq!(buffer.refills(), 1);
        assert_eq!(tall.heightmap().min_max(), (0.1, 0.1));
        assert_eq!(tall.world_height(0, 0), Some(40.0));
    }
}
