//! Convert tree instances into free-standing scene objects

use glam::{Quat, Vec3};

use crate::batch::{BatchExecutor, RunOptions, RunReport, UnitError};
use crate::core::config::BatchConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::progress::ProgressReporter;
use crate::provider::{OperationTarget, TerrainUnitProvider};
use crate::terrain::{TerrainUnit, UnitId};

/// A converted tree
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    /// Prefab the object was instantiated from
    pub prototype: String,
    /// World-space position
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Index into [`SceneObjects::groups`]
    pub group: usize,
    pub source_unit: UnitId,
}

/// Parent node collecting one unit's converted trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneGroup {
    pub name: String,
    pub unit: UnitId,
}

/// Sink for converted objects, grouped per unit
#[derive(Debug, Default)]
pub struct SceneObjects {
    groups: Vec<SceneGroup>,
    objects: Vec<SceneObject>,
}

impl SceneObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the group called `name`, created if missing
    pub fn group(&mut self, name: &str, unit: UnitId) -> usize {
        if let Some(index) = self.groups.iter().position(|g| g.name == name) {
            return index;
        }
        self.groups.push(SceneGroup { name: name.to_string(), unit });
        self.groups.len() - 1
    }

    pub fn groups(&self) -> &[SceneGroup] {
        &self.groups
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects_in_group<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a SceneObject> + 'a {
        let index = self.groups.iter().position(|g| g.name == name);
        self.objects.iter().filter(move |o| Some(o.group) == index)
    }

    pub fn objects_from(&self, unit: UnitId) -> usize {
        self.objects.iter().filter(|o| o.source_unit == unit).count()
    }
}

/// Convert every tree on `unit` into a scene object.
///
/// All or nothing: if any tree cannot be converted no objects are added.
pub fn convert_unit(unit: &TerrainUnit, scene: &mut SceneObjects) -> std::result::Result<usize, UnitError> {
    let prototypes = unit.tree_prototypes();
    let mut converted = Vec::with_capacity(unit.tree_count());

    for (i, tree) in unit.trees().iter().enumerate() {
        let prototype = prototypes.get(tree.prototype_index).ok_or_else(|| {
            UnitError::new(format!(
                "tree {} references missing prototype {}",
                i, tree.prototype_index
            ))
        })?;
        if prototype.prefab.is_empty() {
            return Err(UnitError::new(format!("tree prototype '{}' has no prefab", prototype.name)));
        }
        converted.push(SceneObject {
            name: format!("{} {}", prototype.name, i),
            prototype: prototype.prefab.clone(),
            position: unit.tree_world_position(tree),
            rotation: Quat::from_rotation_y(tree.rotation),
            scale: Vec3::new(tree.width_scale, tree.height_scale, tree.width_scale),
            group: 0,
            source_unit: unit.id,
        });
    }

    let count = converted.len();
    if count > 0 {
        let group = scene.group(&format!("{} Trees", unit.name), unit.id);
        scene.objects.extend(converted.into_iter().map(|o| SceneObject { group, ..o }));
    }
    log::debug!("Converted {} trees on unit {}", count, unit.id);
    Ok(count)
}

/// Convert trees across `target`, then optionally remove the originals.
///
/// Removal is a separate second run over only the units whose conversion
/// succeeded. It is skipped entirely when the conversion run was cancelled
/// or failed as a whole. Returns the reports of the runs that happened.
pub fn convert_trees(
    executor: &BatchExecutor,
    provider: &mut dyn TerrainUnitProvider,
    reporter: &mut dyn ProgressReporter,
    scene: &mut SceneObjects,
    target: &OperationTarget,
    options: &RunOptions,
    remove_after: bool,
) -> Result<Vec<RunReport>> {
    if options.requires_confirmation && !options.confirmed {
        return Err(Error::precondition(format!("'{}' was not confirmed", options.label)));
    }

    if remove_after {
        // Own slot, so clearing it leaves a pending cancel on the main key alone
        let counter = BatchExecutor::new(BatchConfig {
            progress_key: format!("{}-survey", executor.config().progress_key),
            progress_title: "Counting trees".to_string(),
            ..executor.config().clone()
        });
        let mut trees = 0usize;
        let survey = RunOptions::new("Count trees").with_cancel(false);
        counter.run(provider, target, &survey, reporter, |u| {
            trees += u.tree_count();
            Ok(())
        })?;
        if trees == 0 {
            return Err(Error::precondition("no trees to convert on the selected units"));
        }
        log::info!("{} trees to convert before removal", trees);
    }

    let conversion = executor.run(provider, target, options, reporter, |u| {
        convert_unit(u, scene).map(|_| ())
    })?;
    let mut reports = vec![conversion];

    if !remove_after {
        return Ok(reports);
    }
    if reports[0].cancelled {
        log::info!("Conversion cancelled; original trees kept on every unit");
        return Ok(reports);
    }

    let converted = reports[0].succeeded_units();
    if converted.is_empty() {
        log::warn!("No unit converted successfully; original trees kept");
        return Ok(reports);
    }

    let removal_target = OperationTarget::explicit(converted);
    let mut removal = options.clone();
    removal.label = "Remove converted trees".to_string();
    let report = executor.run(provider, &removal_target, &removal, reporter, |u| {
        u.clear_trees();
        Ok(())
    })?;
    reports.push(report);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RunOutcome;
    use crate::progress::{NoProgress, ProgressBoard, ProgressError, ProgressUpdate};
    use crate::provider::TerrainWorld;
    use crate::terrain::{TreeInstance, TreePrototype};
    use std::f32::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn forest(id: u32, prefab: &str, trees: usize) -> TerrainUnit {
        let mut u = TerrainUnit::new(UnitId(id), format!("Terrain {}", id), Vec3::new(100.0, 50.0, 100.0), 33)
            .unwrap()
            .with_position(Vec3::new(100.0 * id as f32, 0.0, 0.0));
        u.set_tree_prototypes(Arc::from(vec![TreePrototype::new("Oak", prefab)]));
        for i in 0..trees {
            let mut tree = TreeInstance::new(0, Vec3::new(0.1 * i as f32, 0.2, 0.5));
            tree.rotation = FRAC_PI_2;
            tree.height_scale = 1.5;
            u.add_tree(tree).unwrap();
        }
        u
    }

    fn executor() -> BatchExecutor {
        BatchExecutor::new(BatchConfig { log_backtraces: false, ..Default::default() })
    }

    /// Requests cancellation once `after` reports have been shown
    struct CancelAfter {
        shows: usize,
        after: usize,
    }

    impl ProgressReporter for CancelAfter {
        fn show(&mut self, _update: &ProgressUpdate) -> std::result::Result<(), ProgressError> {
            self.shows += 1;
            Ok(())
        }

        fn clear(&mut self, _key: &str) -> std::result::Result<(), ProgressError> {
            Ok(())
        }

        fn is_cancel_requested(&self, _key: &str) -> bool {
            self.shows >= self.after
        }
    }

    #[test]
    fn test_convert_unit_places_objects() {
        let unit = forest(1, "prefabs/oak", 2);
        let mut scene = SceneObjects::new();

        assert_eq!(convert_unit(&unit, &mut scene).unwrap(), 2);

        let objects: Vec<_> = scene.objects_in_group("Terrain 1 Trees").collect();
        assert_eq!(objects.len(), 2);
        let second = objects[1];
        assert_eq!(second.position, unit.tree_world_position(&unit.trees()[1]));
        assert_eq!(second.scale, Vec3::new(1.0, 1.5, 1.0));
        assert_eq!(second.rotation, Quat::from_rotation_y(FRAC_PI_2));
        assert_eq!(second.prototype, "prefabs/oak");
        assert_eq!(scene.groups()[0].unit, UnitId(1));
    }

    #[test]
    fn test_convert_unit_is_atomic() {
        let unit = forest(1, "", 3);
        let mut scene = SceneObjects::new();
        assert!(convert_unit(&unit, &mut scene).is_err());
        assert!(scene.is_empty());
        assert!(scene.groups().is_empty());
    }

    #[test]
    fn test_convert_without_removal_keeps_trees() {
        let mut world: TerrainWorld = vec![forest(1, "prefabs/oak", 2), forest(2, "prefabs/oak", 1)]
            .into_iter()
            .collect();
        let mut scene = SceneObjects::new();

        let reports = convert_trees(
            &executor(), &mut world, &mut NoProgress, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees"), false,
        )
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(scene.len(), 3);
        assert_eq!(world.get(UnitId(1)).unwrap().tree_count(), 2);
    }

    #[test]
    fn test_removal_only_where_conversion_succeeded() {
        let mut world: TerrainWorld = vec![
            forest(1, "prefabs/oak", 2),
            forest(2, "", 3),
            forest(3, "prefabs/oak", 1),
        ]
        .into_iter()
        .collect();
        let mut scene = SceneObjects::new();

        let reports = convert_trees(
            &executor(), &mut world, &mut NoProgress, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees").confirmation(true), true,
        )
        .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[0].outcome(),
            RunOutcome::PartialFailure { failed: vec![UnitId(2)], skipped: 0 }
        );
        assert_eq!(reports[1].outcome(), RunOutcome::Success);
        assert_eq!(reports[1].attempted(), 2);

        assert_eq!(world.get(UnitId(1)).unwrap().tree_count(), 0);
        assert_eq!(world.get(UnitId(2)).unwrap().tree_count(), 3);
        assert_eq!(world.get(UnitId(3)).unwrap().tree_count(), 0);
        assert_eq!(scene.objects_from(UnitId(2)), 0);
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn test_cancelled_conversion_removes_nothing() {
        let mut world: TerrainWorld = (1..=3).map(|i| forest(i, "prefabs/oak", 2)).collect();
        let mut scene = SceneObjects::new();
        // Three survey reports, then one conversion report before cancelling
        let mut reporter = CancelAfter { shows: 0, after: 4 };

        let reports = convert_trees(
            &executor(), &mut world, &mut reporter, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees").confirmation(true), true,
        )
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert!(reports[0].outcome().is_cancelled());
        assert_eq!(scene.objects_from(UnitId(1)), 2);
        for id in 1..=3 {
            assert_eq!(world.get(UnitId(id)).unwrap().tree_count(), 2);
        }
    }

    #[test]
    fn test_cancel_during_last_conversion_keeps_trees() {
        let mut world: TerrainWorld = (1..=3).map(|i| forest(i, "prefabs/oak", 2)).collect();
        let mut scene = SceneObjects::new();
        // Three survey reports, then the cancel lands while the third unit converts
        let mut reporter = CancelAfter { shows: 0, after: 6 };

        let reports = convert_trees(
            &executor(), &mut world, &mut reporter, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees").confirmation(true), true,
        )
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome(), RunOutcome::Cancelled { processed: 3 });
        assert_eq!(scene.len(), 6);
        for id in 1..=3 {
            assert_eq!(world.get(UnitId(id)).unwrap().tree_count(), 2);
        }
    }

    #[test]
    fn test_cancel_pending_through_survey_stops_conversion() {
        let mut world: TerrainWorld = (1..=2).map(|i| forest(i, "prefabs/oak", 2)).collect();
        let mut scene = SceneObjects::new();
        let mut board = ProgressBoard::new();
        board.cancel_handle("mass-edit").request();

        let reports = convert_trees(
            &executor(), &mut world, &mut board, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees").confirmation(true), true,
        )
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome(), RunOutcome::Cancelled { processed: 0 });
        assert!(scene.is_empty());
        assert_eq!(world.get(UnitId(1)).unwrap().tree_count(), 2);
        assert_eq!(board.clear_count("mass-edit-survey"), 1);
        assert!(board.slot("mass-edit-survey").is_none());
    }

    #[test]
    fn test_remove_after_with_no_trees_is_precondition() {
        let mut world: TerrainWorld = (1..=2).map(|i| forest(i, "prefabs/oak", 0)).collect();
        let mut scene = SceneObjects::new();

        let result = convert_trees(
            &executor(), &mut world, &mut NoProgress, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees").confirmation(true), true,
        );
        assert!(matches!(result, Err(Error::Precondition(_))));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_unconfirmed_conversion_does_nothing() {
        let mut world: TerrainWorld = (1..=2).map(|i| forest(i, "prefabs/oak", 1)).collect();
        let mut scene = SceneObjects::new();

        let result = convert_trees(
            &executor(), &mut world, &mut NoProgress, &mut scene,
            &OperationTarget::AllUnits, &RunOptions::new("Convert trees").confirmation(false), true,
        );
        assert!(matches!(result, Err(Error::Precondition(_))));
        assert_eq!(world.get(UnitId(1)).unwrap().tree_count(), 1);
    }
}
