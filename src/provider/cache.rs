//! LRU cache for streamed terrain units
//!
//! Keeps a bounded number of units in memory. When the cache is full, the
//! least recently used unit is evicted and handed back to the caller so it
//! can be written to disk.

use std::collections::HashMap;

use crate::terrain::{TerrainUnit, UnitId};

/// LRU cache for terrain units
pub struct UnitCache {
    /// Loaded units by id
    units: HashMap<UnitId, TerrainUnit>,
    /// Access order: oldest first, newest last
    access_order: Vec<UnitId>,
    /// Maximum number of units to keep loaded
    max_units: usize,
}

impl UnitCache {
    /// Create a new cache holding at most `max_units` (minimum 1)
    pub fn new(max_units: usize) -> Self {
        let max_units = max_units.max(1);
        Self {
            units: HashMap::with_capacity(max_units),
            access_order: Vec::with_capacity(max_units),
            max_units,
        }
    }

    /// Get a unit, marking it recently used
    pub fn get(&mut self, id: UnitId) -> Option<&TerrainUnit> {
        if self.units.contains_key(&id) {
            self.touch(id);
            self.units.get(&id)
        } else {
            None
        }
    }

    /// Get a mutable unit, marking it recently used
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut TerrainUnit> {
        if self.units.contains_key(&id) {
            self.touch(id);
            self.units.get_mut(&id)
        } else {
            None
        }
    }

    /// Insert a unit.
    ///
    /// Returns the evicted unit if one was removed to make space, or the
    /// replaced unit if the id was already cached.
    pub fn insert(&mut self, unit: TerrainUnit) -> Option<TerrainUnit> {
        let id = unit.id;

        if self.units.contains_key(&id) {
            self.remove_from_access_order(id);
        }

        let evicted = if self.units.len() >= self.max_units && !self.units.contains_key(&id) {
            self.evict_oldest()
        } else {
            None
        };

        let replaced = self.units.insert(id, unit);
        self.access_order.push(id);

        evicted.or(replaced)
    }

    /// Remove a unit from the cache
    pub fn remove(&mut self, id: UnitId) -> Option<TerrainUnit> {
        self.remove_from_access_order(id);
        self.units.remove(&id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_units
    }

    /// Evict the least recently used unit
    pub fn evict_oldest(&mut self) -> Option<TerrainUnit> {
        let id = self.access_order.first().copied()?;
        log::trace!("Evicting unit {} from cache", id);
        self.remove(id)
    }

    /// Ids of all cached units, oldest first
    pub fn ids(&self) -> impl Iterator<Item = &UnitId> {
        self.access_order.iter()
    }

    /// Iterate over cached units in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &TerrainUnit> {
        self.units.values()
    }

    fn touch(&mut self, id: UnitId) {
        self.remove_from_access_order(id);
        self.access_order.push(id);
    }

    fn remove_from_access_order(&mut self, id: UnitId) {
        if let Some(pos) = self.access_order.iter().position(|&c| c == id) {
            self.access_order.remove(pos);
        }
    }
}
