//! Copy and remove terrain resources

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::batch::UnitError;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::provider::TerrainUnitProvider;
use crate::terrain::{DetailPrototype, TerrainLayer, TerrainUnit, TreePrototype, UnitId};

/// Which resource arrays an operation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceKinds {
    pub layers: bool,
    pub trees: bool,
    pub details: bool,
}

impl Default for ResourceKinds {
    fn default() -> Self {
        Self::all()
    }
}

impl ResourceKinds {
    pub const fn all() -> Self {
        Self { layers: true, trees: true, details: true }
    }

    pub const fn none() -> Self {
        Self { layers: false, trees: false, details: false }
    }

    pub fn is_empty(&self) -> bool {
        !(self.layers || self.trees || self.details)
    }
}

/// Shared references to a source unit's resource arrays
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    source: UnitId,
    layers: Arc<[TerrainLayer]>,
    tree_prototypes: Arc<[TreePrototype]>,
    detail_prototypes: Arc<[DetailPrototype]>,
}

impl ResourceSnapshot {
    pub fn capture(unit: &TerrainUnit) -> Self {
        Self {
            source: unit.id,
            layers: Arc::clone(unit.layers()),
            tree_prototypes: Arc::clone(unit.tree_prototypes()),
            detail_prototypes: Arc::clone(unit.detail_prototypes()),
        }
    }

    /// Load the source unit, take its arrays and release it
    pub fn capture_from(provider: &mut dyn TerrainUnitProvider, id: UnitId) -> Result<Self> {
        let unit = provider
            .load(id)
            .map_err(|e| Error::precondition(format!("resource source {} unavailable: {}", id, e)))?;
        let snapshot = Self::capture(unit);
        provider.release_if_transient(id)?;
        Ok(snapshot)
    }

    pub fn source(&self) -> UnitId {
        self.source
    }
}

/// Assign the selected arrays from `snapshot` to `unit` by reference
pub fn copy_resources(
    snapshot: &ResourceSnapshot,
    unit: &mut TerrainUnit,
    kinds: ResourceKinds,
) -> std::result::Result<(), UnitError> {
    if kinds.layers {
        unit.set_layers(Arc::clone(&snapshot.layers));
    }
    if kinds.trees {
        unit.set_tree_prototypes(Arc::clone(&snapshot.tree_prototypes));
    }
    if kinds.details {
        unit.set_detail_prototypes(Arc::clone(&snapshot.detail_prototypes));
    }
    Ok(())
}

/// Clear the selected arrays on `unit`.
///
/// Detail densities are zeroed while the old prototype indices are still
/// valid, then the prototype array is emptied.
pub fn remove_resources(unit: &mut TerrainUnit, kinds: ResourceKinds) -> std::result::Result<(), UnitError> {
    if kinds.layers {
        unit.set_layers(Arc::from(Vec::new()));
    }

    if kinds.trees {
        unit.clear_trees();
        unit.set_tree_prototypes(Arc::from(Vec::new()));
    }

    if kinds.details {
        let res = unit.detail_resolution();
        let zeros = vec![0u16; res * res];
        for index in 0..unit.detail_prototypes().len() {
            unit.set_detail_density(index, &zeros)?;
        }
        unit.set_detail_prototypes(Arc::from(Vec::new()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TerrainWorld;
    use crate::terrain::{TerrainError, TreeInstance};
    use glam::Vec3;

    fn bare(id: u32) -> TerrainUnit {
        TerrainUnit::new(UnitId(id), format!("Terrain {}", id), Vec3::splat(100.0), 33).unwrap()
    }

    fn dressed(id: u32) -> TerrainUnit {
        let mut u = bare(id);
        u.set_layers(Arc::from(vec![
            TerrainLayer::new("Grass", "textures/grass.png"),
            TerrainLayer::new("Rock", "textures/rock.png"),
        ]));
        u.set_tree_prototypes(Arc::from(vec![TreePrototype::new("Oak", "prefabs/oak")]));
        u.add_tree(TreeInstance::new(0, Vec3::new(0.5, 0.0, 0.5))).unwrap();
        u.set_detail_prototypes(Arc::from(vec![
            DetailPrototype::new("Grass", "textures/grass_blade.png"),
            DetailPrototype::new("Fern", "meshes/fern"),
        ]));
        let res = u.detail_resolution();
        u.set_detail_density(0, &vec![4; res * res]).unwrap();
        u.set_detail_density(1, &vec![2; res * res]).unwrap();
        u
    }

    #[test]
    fn test_copy_shares_arrays() {
        let source = dressed(1);
        let snapshot = ResourceSnapshot::capture(&source);
        let mut target = bare(2);

        copy_resources(&snapshot, &mut target, ResourceKinds::all()).unwrap();

        assert!(Arc::ptr_eq(target.layers(), source.layers()));
        assert!(Arc::ptr_eq(target.tree_prototypes(), source.tree_prototypes()));
        assert!(Arc::ptr_eq(target.detail_prototypes(), source.detail_prototypes()));
        assert_eq!(target.alphamaps().layer_count(), 2);
        assert_eq!(target.details().layer_count(), 2);
        // Instances are not resources
        assert_eq!(target.tree_count(), 0);
    }

    #[test]
    fn test_copy_only_selected() {
        let snapshot = ResourceSnapshot::capture(&dressed(1));
        let mut target = bare(2);
        let kinds = ResourceKinds { trees: true, ..ResourceKinds::none() };

        copy_resources(&snapshot, &mut target, kinds).unwrap();

        assert!(target.layers().is_empty());
        assert_eq!(target.tree_prototypes().len(), 1);
        assert!(target.detail_prototypes().is_empty());
    }

    #[test]
    fn test_copy_is_idempotent() {
        let snapshot = ResourceSnapshot::capture(&dressed(1));
        let mut target = bare(2);
        copy_resources(&snapshot, &mut target, ResourceKinds::all()).unwrap();
        let once = target.clone();
        copy_resources(&snapshot, &mut target, ResourceKinds::all()).unwrap();
        assert_eq!(target.layers(), once.layers());
        assert_eq!(target.details(), once.details());
    }

    #[test]
    fn test_capture_from_provider() {
        let mut world = TerrainWorld::new();
        world.add(dressed(1)).unwrap();
        let snapshot = ResourceSnapshot::capture_from(&mut world, UnitId(1)).unwrap();
        assert_eq!(snapshot.source(), UnitId(1));

        let missing = ResourceSnapshot::capture_from(&mut world, UnitId(2));
        assert!(matches!(missing, Err(Error::Precondition(_))));
    }

    #[test]
    fn test_remove_everything() {
        let mut u = dressed(1);
        remove_resources(&mut u, ResourceKinds::all()).unwrap();

        assert!(u.layers().is_empty());
        assert_eq!(u.alphamaps().layer_count(), 0);
        assert!(u.tree_prototypes().is_empty());
        assert_eq!(u.tree_count(), 0);
        assert!(u.detail_prototypes().is_empty());
        assert_eq!(u.details().total_density(), 0);

        // Running again on an empty unit is a no-op
        remove_resources(&mut u, ResourceKinds::all()).unwrap();
    }

    #[test]
    fn test_remove_details_zeroes_every_index_first() {
        let mut u = dressed(1);
        assert!(u.details().total_density() > 0);

        let kinds = ResourceKinds { details: true, ..ResourceKinds::none() };
        remove_resources(&mut u, kinds).unwrap();

        assert!(u.detail_prototypes().is_empty());
        assert_eq!(u.details().total_density(), 0);
        // Other arrays untouched
        assert_eq!(u.layers().len(), 2);
        assert_eq!(u.tree_count(), 1);
    }

    #[test]
    fn test_clearing_prototypes_before_zeroing_is_rejected() {
        let mut u = dressed(1);
        let count = u.detail_prototypes().len();
        assert!(count > 0);

        let res = u.detail_resolution();
        u.set_detail_prototypes(Arc::from(Vec::new()));
        let result = u.set_detail_density(0, &vec![0; res * res]);

        assert_eq!(result, Err(TerrainError::DetailIndexOutOfRange { index: 0, count: 0 }));
    }
}
