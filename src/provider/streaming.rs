//! Units streamed from a world directory on demand

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::config::BatchConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::terrain::{TerrainUnit, UnitId};

use super::cache::UnitCache;
use super::disk_io::{self, WorldManifest};
use super::{OperationTarget, TerrainUnitProvider, UnitSequence};

/// World whose units live on disk and are loaded into a bounded cache.
///
/// Units loaded by [`TerrainUnitProvider::load`] are transient: releasing
/// them writes them back and evicts them. Units made resident with
/// [`StreamingWorld::preload`] stay loaded until [`StreamingWorld::flush`]
/// or cache pressure pushes them out (evicted units are always saved).
pub struct StreamingWorld {
    dir: PathBuf,
    manifest: WorldManifest,
    cache: UnitCache,
    transient: HashSet<UnitId>,
    save_on_release: bool,
}

impl StreamingWorld {
    /// Open an existing world directory
    pub fn open(dir: impl AsRef<Path>, config: &BatchConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let manifest = disk_io::load_manifest(&dir)?;
        log::info!(
            "Opened world '{}' with {} units from {}",
            manifest.name, manifest.units.len(), dir.display()
        );
        Ok(Self {
            dir,
            manifest,
            cache: UnitCache::new(config.cache_capacity),
            transient: HashSet::new(),
            save_on_release: config.save_on_release,
        })
    }

    /// Write units and a manifest to `dir`, then open it
    pub fn create(
        dir: impl AsRef<Path>,
        name: &str,
        units: impl IntoIterator<Item = TerrainUnit>,
        config: &BatchConfig,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let mut manifest = WorldManifest::new(name);
        for unit in units {
            if manifest.entry(unit.id).is_some() {
                return Err(Error::Provider(format!("unit {} listed twice", unit.id)));
            }
            disk_io::save_unit(dir, &unit)?;
            manifest.upsert(&unit);
        }
        disk_io::save_manifest(dir, &manifest)?;
        Self::open(dir, config)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &WorldManifest {
        &self.manifest
    }

    pub fn is_loaded(&self, id: UnitId) -> bool {
        self.cache.contains(id)
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.len()
    }

    /// Load a unit and keep it resident across passes
    pub fn preload(&mut self, id: UnitId) -> Result<()> {
        self.ensure_loaded(id)?;
        self.transient.remove(&id);
        Ok(())
    }

    /// Save every loaded unit and the manifest, then unload everything
    pub fn flush(&mut self) -> Result<()> {
        let ids: Vec<UnitId> = self.cache.ids().copied().collect();
        for id in ids {
            if let Some(unit) = self.cache.remove(id) {
                self.store(&unit)?;
            }
        }
        self.transient.clear();
        disk_io::save_manifest(&self.dir, &self.manifest)
    }

    fn store(&mut self, unit: &TerrainUnit) -> Result<()> {
        disk_io::save_unit(&self.dir, unit)?;
        self.manifest.upsert(unit);
        Ok(())
    }

    fn ensure_loaded(&mut self, id: UnitId) -> Result<()> {
        if self.cache.contains(id) {
            return Ok(());
        }
        if self.manifest.entry(id).is_none() {
            return Err(Error::Provider(format!("unit {} is not in the world manifest", id)));
        }

        let unit = disk_io::load_unit(&self.dir, id)
            .map_err(|e| Error::Provider(format!("failed to load unit {}: {}", id, e)))?
            .ok_or_else(|| Error::Provider(format!("unit {} file is missing", id)))?;
        log::debug!("Streamed in unit {} ({})", id, unit.name);

        if let Some(evicted) = self.cache.insert(unit) {
            self.transient.remove(&evicted.id);
            log::debug!("Cache full; writing back evicted unit {}", evicted.id);
            self.store(&evicted)?;
        }
        self.transient.insert(id);
        Ok(())
    }
}

impl TerrainUnitProvider for StreamingWorld {
    fn has_streaming_units(&self) -> bool {
        true
    }

    fn units(&self, target: &OperationTarget) -> Result<UnitSequence> {
        UnitSequence::plan(target, &self.manifest.ids(), true)
    }

    fn load(&mut self, id: UnitId) -> Result<&mut TerrainUnit> {
        self.ensure_loaded(id)?;
        self.cache
            .get_mut(id)
            .ok_or_else(|| Error::Provider(format!("unit {} vanished from cache", id)))
    }

    fn release_if_transient(&mut self, id: UnitId) -> Result<()> {
        if !self.transient.remove(&id) {
            return Ok(());
        }
        let Some(unit) = self.cache.remove(id) else {
            return Ok(());
        };
        if self.save_on_release {
            self.store(&unit)?;
            disk_io::save_manifest(&self.dir, &self.manifest)?;
        }
        log::debug!("Released transient unit {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn unit(id: u32) -> TerrainUnit {
        TerrainUnit::new(UnitId(id), format!("Terrain {}", id), Vec3::splat(64.0), 33).unwrap()
    }

    fn world(dir: &Path, count: u32, config: &BatchConfig) -> StreamingWorld {
        StreamingWorld::create(dir, "test", (1..=count).map(unit), config).unwrap()
    }

    #[test]
    fn test_create_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let w = world(dir.path(), 3, &BatchConfig::default());
        assert!(w.has_streaming_units());
        assert_eq!(w.manifest().units.len(), 3);
        assert_eq!(w.loaded_count(), 0);

        let reopened = StreamingWorld::open(dir.path(), &BatchConfig::default()).unwrap();
        assert_eq!(reopened.manifest().ids(), vec![UnitId(1), UnitId(2), UnitId(3)]);
    }

    #[test]
    fn test_load_then_release_writes_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = world(dir.path(), 2, &BatchConfig::default());

        w.load(UnitId(2)).unwrap().heightmap_mut().set(0, 0, 0.5).unwrap();
        assert!(w.is_loaded(UnitId(2)));

        w.release_if_transient(UnitId(2)).unwrap();
        assert!(!w.is_loaded(UnitId(2)));

        let on_disk = disk_io::load_unit(dir.path(), UnitId(2)).unwrap().unwrap();
        assert_eq!(on_disk.heightmap().get(0, 0), Some(0.5));
    }

    #[test]
    fn test_release_without_save() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig { save_on_release: false, ..Default::default() };
        let mut w = world(dir.path(), 1, &config);

        w.load(UnitId(1)).unwrap().heightmap_mut().set(0, 0, 0.5).unwrap();
        w.release_if_transient(UnitId(1)).unwrap();

        let on_disk = disk_io::load_unit(dir.path(), UnitId(1)).unwrap().unwrap();
        assert_eq!(on_disk.heightmap().get(0, 0), Some(0.0));
    }

    #[test]
    fn test_preloaded_unit_stays_resident() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = world(dir.path(), 2, &BatchConfig::default());

        w.preload(UnitId(1)).unwrap();
        w.load(UnitId(1)).unwrap();
        w.release_if_transient(UnitId(1)).unwrap();
        assert!(w.is_loaded(UnitId(1)));

        w.flush().unwrap();
        assert_eq!(w.loaded_count(), 0);
    }

    #[test]
    fn test_eviction_saves_unit() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig { cache_capacity: 1, ..Default::default() };
        let mut w = world(dir.path(), 2, &config);

        w.preload(UnitId(1)).unwrap();
        w.load(UnitId(1)).unwrap().name = "Edited".into();
        w.load(UnitId(2)).unwrap();
        assert!(!w.is_loaded(UnitId(1)));

        let on_disk = disk_io::load_unit(dir.path(), UnitId(1)).unwrap().unwrap();
        assert_eq!(on_disk.name, "Edited");
        assert_eq!(w.manifest().entry(UnitId(1)).unwrap().name, "Edited");
    }

    #[test]
    fn test_unknown_and_missing_units() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = world(dir.path(), 2, &BatchConfig::default());
        assert!(matches!(w.load(UnitId(9)), Err(Error::Provider(_))));

        disk_io::delete_unit(dir.path(), UnitId(2)).unwrap();
        assert!(matches!(w.load(UnitId(2)), Err(Error::Provider(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let result = StreamingWorld::create(dir.path(), "dup", vec![unit(1), unit(1)], &BatchConfig::default());
        assert!(matches!(result, Err(Error::Provider(_))));
    }
}
