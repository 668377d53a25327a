//! A single terrain surface and its resources

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::heightmap::Heightmap;
use super::resources::{
    Alphamaps, DetailLayers, DetailPrototype, TerrainLayer, TreeInstance, TreePrototype,
};
use super::settings::TerrainSettings;
use super::TerrainError;

/// Stable identity of a terrain unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Default detail density resolution for new units
pub const DEFAULT_DETAIL_RESOLUTION: usize = 64;
/// Default alphamap resolution for new units
pub const DEFAULT_ALPHAMAP_RESOLUTION: usize = 64;

/// One terrain surface.
///
/// Resource arrays are shared (`Arc<[T]>`); assigning them copies the
/// reference, not the prototypes. Per-cell buffers (alphamaps, detail
/// densities) are kept in step with their arrays by the setters below.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainUnit {
    pub id: UnitId,
    pub name: String,
    pub active: bool,
    /// World-space origin (min corner)
    pub position: Vec3,
    /// World-space size: width (x), vertical size (y), length (z)
    pub size: Vec3,
    pub settings: TerrainSettings,
    heightmap: Heightmap,
    layers: Arc<[TerrainLayer]>,
    alphamaps: Alphamaps,
    tree_prototypes: Arc<[TreePrototype]>,
    trees: Vec<TreeInstance>,
    detail_prototypes: Arc<[DetailPrototype]>,
    details: DetailLayers,
}

impl TerrainUnit {
    /// Create an empty, active unit at the origin
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        size: Vec3,
        heightmap_resolution: usize,
    ) -> Result<Self, TerrainError> {
        Ok(Self {
            id,
            name: name.into(),
            active: true,
            position: Vec3::ZERO,
            size,
            settings: TerrainSettings::default(),
            heightmap: Heightmap::new(heightmap_resolution)?,
            layers: Arc::from(Vec::new()),
            alphamaps: Alphamaps::new(DEFAULT_ALPHAMAP_RESOLUTION),
            tree_prototypes: Arc::from(Vec::new()),
            trees: Vec::new(),
            detail_prototypes: Arc::from(Vec::new()),
            details: DetailLayers::new(DEFAULT_DETAIL_RESOLUTION),
        })
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// World-space (min, max) corners
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.position, self.position + self.size)
    }

    // --- Heightmap ---

    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    pub fn heightmap_mut(&mut self) -> &mut Heightmap {
        &mut self.heightmap
    }

    pub fn heightmap_resolution(&self) -> usize {
        self.heightmap.resolution()
    }

    /// Destructive: resets every height to zero
    pub fn set_heightmap_resolution(&mut self, resolution: usize) -> Result<(), TerrainError> {
        if resolution != self.heightmap.resolution() {
            self.heightmap.set_resolution(resolution)?;
        }
        Ok(())
    }

    /// World-space height at a sample, from the normalized value
    pub fn world_height(&self, x: usize, z: usize) -> Option<f32> {
        self.heightmap
            .get(x, z)
            .map(|h| self.position.y + h * self.size.y)
    }

    // --- Layers ---

    pub fn layers(&self) -> &Arc<[TerrainLayer]> {
        &self.layers
    }

    /// Assign the layer array and resize the alphamaps to match
    pub fn set_layers(&mut self, layers: Arc<[TerrainLayer]>) {
        self.alphamaps.resize_layers(layers.len());
        self.layers = layers;
    }

    pub fn alphamaps(&self) -> &Alphamaps {
        &self.alphamaps
    }

    pub fn alphamap_resolution(&self) -> usize {
        self.alphamaps.resolution()
    }

    /// Destructive: splat weights are reset
    pub fn set_alphamap_resolution(&mut self, resolution: usize) {
        if resolution != self.alphamaps.resolution() {
            self.alphamaps.set_resolution(resolution);
        }
    }

    // --- Trees ---

    pub fn tree_prototypes(&self) -> &Arc<[TreePrototype]> {
        &self.tree_prototypes
    }

    /// Assign the tree prototype array.
    ///
    /// Instances whose prototype index no longer exists are dropped.
    pub fn set_tree_prototypes(&mut self, prototypes: Arc<[TreePrototype]>) {
        let count = prototypes.len();
        let before = self.trees.len();
        self.trees.retain(|t| t.prototype_index < count);
        let dropped = before - self.trees.len();
        if dropped > 0 {
            log::warn!(
                "Unit {} dropped {} tree instances with no matching prototype",
                self.id, dropped
            );
        }
        self.tree_prototypes = prototypes;
    }

    pub fn trees(&self) -> &[TreeInstance] {
        &self.trees
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Add a tree instance; its prototype index must exist
    pub fn add_tree(&mut self, tree: TreeInstance) -> Result<(), TerrainError> {
        if tree.prototype_index >= self.tree_prototypes.len() {
            return Err(TerrainError::TreePrototypeOutOfRange {
                index: tree.prototype_index,
                count: self.tree_prototypes.len(),
            });
        }
        self.trees.push(tree);
        Ok(())
    }

    /// Remove all tree instances, keeping prototypes
    pub fn clear_trees(&mut self) {
        self.trees.clear();
    }

    /// World-space position of a tree instance
    pub fn tree_world_position(&self, tree: &TreeInstance) -> Vec3 {
        self.position + tree.position * self.size
    }

    // --- Details ---

    pub fn detail_prototypes(&self) -> &Arc<[DetailPrototype]> {
        &self.detail_prototypes
    }

    /// Assign the detail prototype array and resize density buffers to match.
    ///
    /// Buffers beyond the new count are discarded with their densities.
    pub fn set_detail_prototypes(&mut self, prototypes: Arc<[DetailPrototype]>) {
        self.details.resize_layers(prototypes.len());
        self.detail_prototypes = prototypes;
    }

    pub fn details(&self) -> &DetailLayers {
        &self.details
    }

    pub fn detail_resolution(&self) -> usize {
        self.details.resolution()
    }

    /// Destructive: all densities are reset
    pub fn set_detail_resolution(&mut self, resolution: usize) {
        if resolution != self.details.resolution() {
            self.details.set_resolution(resolution);
        }
    }

    /// Write a density buffer; index must be a current detail prototype
    pub fn set_detail_density(&mut self, index: usize, values: &[u16]) -> Result<(), TerrainError> {
        if index >= self.detail_prototypes.len() {
            return Err(TerrainError::DetailIndexOutOfRange {
                index,
                count: self.detail_prototypes.len(),
            });
        }
        self.details.set_density(index, values)
    }

    /// Check the invariants the setters maintain. Needed for units built
    /// outside them, such as those read back from disk.
    pub fn validate(&self) -> Result<(), TerrainError> {
        self.heightmap.check()?;
        self.alphamaps.check(self.layers.len())?;
        self.details.check(self.detail_prototypes.len())?;
        let count = self.tree_prototypes.len();
        if let Some(tree) = self.trees.iter().find(|t| t.prototype_index >= count) {
            return Err(TerrainError::TreePrototypeOutOfRange { index: tree.prototype_index, count });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> TerrainUnit {
        TerrainUnit::new(UnitId(1), "Terrain 1", Vec3::new(100.0, 50.0, 100.0), 33).unwrap()
    }

    #[test]
    fn test_new_unit() {
        let u = unit();
        assert!(u.active);
        assert_eq!(u.heightmap_resolution(), 33);
        assert!(u.layers().is_empty());
        assert_eq!(u.tree_count(), 0);
        assert_eq!(u.details().layer_count(), 0);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let result = TerrainUnit::new(UnitId(1), "bad", Vec3::ONE, 100);
        assert!(matches!(result, Err(TerrainError::InvalidResolution(100))));
    }

    #[test]
    fn test_bounds_and_world_height() {
        let mut u = unit().with_position(Vec3::new(10.0, 5.0, 20.0));
        u.heightmap_mut().set(0, 0, 0.5).unwrap();

        let (min, max) = u.bounds();
        assert_eq!(min, Vec3::new(10.0, 5.0, 20.0));
        assert_eq!(max, Vec3::new(110.0, 55.0, 120.0));
        assert_eq!(u.world_height(0, 0), Some(30.0));
    }

    #[test]
    fn test_layers_shared_by_reference() {
        let mut a = unit();
        let mut b = unit();
        a.set_layers(Arc::from(vec![TerrainLayer::new("Grass", "grass.png")]));
        b.set_layers(a.layers().clone());

        assert!(Arc::ptr_eq(a.layers(), b.layers()));
        assert_eq!(b.alphamaps().layer_count(), 1);
    }

    #[test]
    fn test_add_tree_requires_prototype() {
        let mut u = unit();
        assert!(u.add_tree(TreeInstance::new(0, Vec3::splat(0.5))).is_err());

        u.set_tree_prototypes(Arc::from(vec![TreePrototype::new("Oak", "oak.prefab")]));
        u.add_tree(TreeInstance::new(0, Vec3::splat(0.5))).unwrap();
        assert_eq!(u.tree_count(), 1);
    }

    #[test]
    fn test_shrinking_tree_prototypes_drops_orphans() {
        let mut u = unit();
        u.set_tree_prototypes(Arc::from(vec![
            TreePrototype::new("Oak", "oak.prefab"),
            TreePrototype::new("Pine", "pine.prefab"),
        ]));
        u.add_tree(TreeInstance::new(0, Vec3::ZERO)).unwrap();
        u.add_tree(TreeInstance::new(1, Vec3::ONE)).unwrap();

        u.set_tree_prototypes(Arc::from(vec![TreePrototype::new("Oak", "oak.prefab")]));
        assert_eq!(u.tree_count(), 1);
        assert_eq!(u.trees()[0].prototype_index, 0);
    }

    #[test]
    fn test_tree_world_position() {
        let u = unit().with_position(Vec3::new(100.0, 0.0, 0.0));
        let tree = TreeInstance::new(0, Vec3::new(0.5, 0.2, 1.0));
        assert_eq!(u.tree_world_position(&tree), Vec3::new(150.0, 10.0, 100.0));
    }

    #[test]
    fn test_detail_density_tracks_prototypes() {
        let mut u = unit();
        let cells = u.detail_resolution() * u.detail_resolution();
        assert!(u.set_detail_density(0, &vec![1; cells]).is_err());

        u.set_detail_prototypes(Arc::from(vec![DetailPrototype::new("Grass", "grass.png")]));
        u.set_detail_density(0, &vec![1; cells]).unwrap();
        assert_eq!(u.details().total_density(), cells as u64);
    }

    #[test]
    fn test_validate_catches_orphan_tree() {
        let mut u = unit();
        u.set_layers(Arc::from(vec![TerrainLayer::new("Grass", "grass.png")]));
        u.set_tree_prototypes(Arc::from(vec![TreePrototype::new("Oak", "oak.prefab")]));
        u.add_tree(TreeInstance::new(0, Vec3::splat(0.25))).unwrap();
        assert_eq!(u.validate(), Ok(()));

        let mut json = serde_json::to_value(&u).unwrap();
        json["tree_prototypes"] = serde_json::json!([]);
        let broken: TerrainUnit = serde_json::from_value(json).unwrap();
        assert_eq!(
            broken.validate(),
            Err(TerrainError::TreePrototypeOutOfRange { index: 0, count: 0 })
        );
    }

    #[test]
    fn test_validate_catches_missing_alphamap() {
        let mut u = unit();
        u.set_layers(Arc::from(vec![TerrainLayer::new("Grass", "grass.png")]));

        let mut json = serde_json::to_value(&u).unwrap();
        json["alphamaps"]["layers"] = serde_json::json!([]);
        let broken: TerrainUnit = serde_json::from_value(json).unwrap();
        assert_eq!(
            broken.validate(),
            Err(TerrainError::BufferSizeMismatch { expected: 1, actual: 0 })
        );
    }

    #[test]
    fn test_json_roundtrip_keeps_resources() {
        let mut u = unit();
        u.set_tree_prototypes(Arc::from(vec![TreePrototype::new("Oak", "oak.prefab")]));
        u.add_tree(TreeInstance::new(0, Vec3::splat(0.25))).unwrap();

        let json = serde_json::to_string(&u).unwrap();
        let back: TerrainUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, u.id);
        assert_eq!(back.trees(), u.trees());
        assert_eq!(back.tree_prototypes()[0].name, "Oak");
    }
}
