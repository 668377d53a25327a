//! Resident collection of terrain units

use crate::core::error::Error;
use crate::core::types::Result;
use crate::terrain::{TerrainUnit, UnitId};

use super::{OperationTarget, TerrainUnitProvider, UnitSequence};

/// All units held in memory, in registration order.
#[derive(Debug, Clone, Default)]
pub struct TerrainWorld {
    units: Vec<TerrainUnit>,
}

impl TerrainWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit. Ids must be unique.
    pub fn add(&mut self, unit: TerrainUnit) -> Result<()> {
        if self.contains(unit.id) {
            return Err(Error::Provider(format!("unit {} already registered", unit.id)));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Unregister a unit, returning it
    pub fn remove(&mut self, id: UnitId) -> Option<TerrainUnit> {
        let index = self.units.iter().position(|u| u.id == id)?;
        Some(self.units.remove(index))
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.iter().any(|u| u.id == id)
    }

    pub fn get(&self, id: UnitId) -> Option<&TerrainUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut TerrainUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn as_slice(&self) -> &[TerrainUnit] {
        &self.units
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl FromIterator<TerrainUnit> for TerrainWorld {
    /// Later units with an already-seen id are ignored
    fn from_iter<I: IntoIterator<Item = TerrainUnit>>(iter: I) -> Self {
        let mut world = TerrainWorld::new();
        for unit in iter {
            if let Err(e) = world.add(unit) {
                log::warn!("{}", e);
            }
        }
        world
    }
}

impl TerrainUnitProvider for TerrainWorld {
    fn has_streaming_units(&self) -> bool {
        false
    }

    fn units(&self, target: &OperationTarget) -> Result<UnitSequence> {
        UnitSequence::plan(target, &self.ids(), true)
    }

    fn load(&mut self, id: UnitId) -> Result<&mut TerrainUnit> {
        self.get_mut(id)
            .ok_or_else(|| Error::Provider(format!("unit {} is not registered", id)))
    }

    fn release_if_transient(&mut self, _id: UnitId) -> Result<()> {
        Ok(())
    }
}
