//! Unit files and world manifest on disk

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::terrain::{TerrainUnit, UnitId};

/// File name of the world manifest inside a world directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// One registered unit in a world manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: UnitId,
    pub name: String,
    pub active: bool,
    /// Cached tree count, refreshed whenever the unit is saved through the world
    #[serde(default)]
    pub tree_count: usize,
}

impl ManifestEntry {
    pub fn from_unit(unit: &TerrainUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            active: unit.active,
            tree_count: unit.tree_count(),
        }
    }
}

/// Ordered list of units in a world directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldManifest {
    pub name: String,
    pub units: Vec<ManifestEntry>,
}

impl WorldManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
        }
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|e| e.id).collect()
    }

    pub fn entry(&self, id: UnitId) -> Option<&ManifestEntry> {
        self.units.iter().find(|e| e.id == id)
    }

    /// Insert or refresh the entry for a unit, keeping its position
    pub fn upsert(&mut self, unit: &TerrainUnit) {
        let entry = ManifestEntry::from_unit(unit);
        match self.units.iter_mut().find(|e| e.id == unit.id) {
            Some(existing) => *existing = entry,
            None => self.units.push(entry),
        }
    }
}

/// Path of a unit file: `base_dir/unit_{id}.json`
pub fn unit_path(base_dir: &Path, id: UnitId) -> PathBuf {
    base_dir.join(format!("unit_{}.json", id.0))
}

pub fn manifest_path(base_dir: &Path) -> PathBuf {
    base_dir.join(MANIFEST_FILE)
}

/// Save a unit to disk, creating the directory if needed
pub fn save_unit(base_dir: &Path, unit: &TerrainUnit) -> Result<()> {
    std::fs::create_dir_all(base_dir)?;
    let data = serde_json::to_vec(unit)?;
    std::fs::write(unit_path(base_dir, unit.id), data)?;
    Ok(())
}

/// Load a unit from disk (if it exists).
///
/// A file that parses but breaks the unit's buffer invariants is an error.
pub fn load_unit(base_dir: &Path, id: UnitId) -> Result<Option<TerrainUnit>> {
    let path = unit_path(base_dir, id);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(&path)?;
    let unit: TerrainUnit = serde_json::from_slice(&data)?;
    unit.validate()
        .map_err(|e| Error::Provider(format!("unit {} file is corrupt: {}", id, e)))?;
    Ok(Some(unit))
}

/// Delete a unit file
pub fn delete_unit(base_dir: &Path, id: UnitId) -> Result<()> {
    let path = unit_path(base_dir, id);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

pub fn unit_exists(base_dir: &Path, id: UnitId) -> bool {
    unit_path(base_dir, id).exists()
}

pub fn save_manifest(base_dir: &Path, manifest: &WorldManifest) -> Result<()> {
    std::fs::create_dir_all(base_dir)?;
    let text = serde_json::to_string_pretty(manifest)?;
    std::fs::write(manifest_path(base_dir), text)?;
    Ok(())
}

pub fn load_manifest(base_dir: &Path) -> Result<WorldManifest> {
    let text = std::fs::read_to_string(manifest_path(base_dir))?;
    Ok(serde_json::from_str(&text)?)
}
