//! Catalog of batch terrain operations
//!
//! Each [`Operation`] variant carries only its own parameters and is
//! dispatched once into a mutation closure for [`BatchExecutor::run`].
//! Operations that need a prototype capture it before the run and drop it
//! after, whatever the outcome.

pub mod set_height;
pub mod prototype;
pub mod resources;
pub mod convert;

pub use set_height::HeightBuffer;
pub use prototype::PrototypeTemplate;
pub use resources::{copy_resources, remove_resources, ResourceKinds, ResourceSnapshot};
pub use convert::{convert_trees, convert_unit, SceneGroup, SceneObject, SceneObjects};

use serde::{Deserialize, Serialize};

use crate::batch::{BatchExecutor, RunOptions, RunOutcome, RunReport};
use crate::core::error::Error;
use crate::core::types::Result;
use crate::progress::ProgressReporter;
use crate::provider::{OperationTarget, TerrainUnitProvider};
use crate::terrain::UnitId;

/// A batch operation and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "params")]
pub enum Operation {
    /// Flatten to `height` world units above each unit's origin
    SetHeight { height: f32 },
    ApplySettingsFromPrototype {
        prototype: UnitId,
        #[serde(default)]
        copy_heightmap_resolution: bool,
    },
    CopyResources {
        source: UnitId,
        #[serde(default)]
        kinds: ResourceKinds,
    },
    RemoveResources {
        #[serde(default)]
        kinds: ResourceKinds,
    },
    ConvertTreesToGameObjects {
        #[serde(default)]
        remove_after: bool,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SetHeight { .. } => "Set Height",
            Operation::ApplySettingsFromPrototype { .. } => "Apply Settings From Prototype",
            Operation::CopyResources { .. } => "Copy Resources",
            Operation::RemoveResources { .. } => "Remove Resources",
            Operation::ConvertTreesToGameObjects { .. } => "Convert Trees To Game Objects",
        }
    }

    /// Whether a prototype unit is captured before the run
    pub fn requires_prototype(&self) -> bool {
        matches!(
            self,
            Operation::ApplySettingsFromPrototype { .. } | Operation::CopyResources { .. }
        )
    }

    /// Prompt the user must accept before the operation runs
    pub fn confirmation_message(&self, target: &OperationTarget) -> String {
        let scope = describe_target(target);
        match self {
            Operation::SetHeight { height } => {
                format!("Set the height of {} to {}? Existing sculpting is lost.", scope, height)
            }
            Operation::ApplySettingsFromPrototype { prototype, copy_heightmap_resolution } => {
                let mut msg = format!("Copy the settings of terrain {} onto {}?", prototype, scope);
                if *copy_heightmap_resolution {
                    msg.push_str(" Heightmap resolution is copied too, which resets all heights.");
                }
                msg
            }
            Operation::CopyResources { source, kinds } => {
                format!("Copy {} from terrain {} to {}?", describe_kinds(*kinds), source, scope)
            }
            Operation::RemoveResources { kinds } => {
                format!("Remove all {} from {}? This cannot be undone.", describe_kinds(*kinds), scope)
            }
            Operation::ConvertTreesToGameObjects { remove_after } => {
                if *remove_after {
                    format!(
                        "Convert the trees on {} to scene objects, then remove the original trees?",
                        scope
                    )
                } else {
                    format!("Convert the trees on {} to scene objects?", scope)
                }
            }
        }
    }

    /// Reject parameters no run could succeed with
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::SetHeight { height } if !height.is_finite() || *height < 0.0 => {
                Err(Error::precondition(format!("target height {} must be a finite value >= 0", height)))
            }
            Operation::CopyResources { kinds, .. } | Operation::RemoveResources { kinds }
                if kinds.is_empty() =>
            {
                Err(Error::precondition("no resource kinds selected"))
            }
            _ => Ok(()),
        }
    }
}

fn describe_target(target: &OperationTarget) -> String {
    match target {
        OperationTarget::AllUnits => "all terrains".to_string(),
        OperationTarget::ActiveUnitsOnly => "all active terrains".to_string(),
        OperationTarget::ExplicitList(ids) => {
            let listed = ids.iter().flatten().count();
            if listed == 1 {
                "1 selected terrain".to_string()
            } else {
                format!("{} selected terrains", listed)
            }
        }
    }
}

fn describe_kinds(kinds: ResourceKinds) -> String {
    let mut names = Vec::new();
    if kinds.layers {
        names.push("terrain layers");
    }
    if kinds.trees {
        names.push("tree prototypes");
    }
    if kinds.details {
        names.push("detail prototypes");
    }
    names.join(" and ")
}

/// Collaborators an operation runs against
pub struct OperationContext<'a> {
    pub executor: &'a BatchExecutor,
    pub provider: &'a mut dyn TerrainUnitProvider,
    pub reporter: &'a mut dyn ProgressReporter,
    /// Receives objects created by tree conversion
    pub scene: &'a mut SceneObjects,
}

/// Result of one operation: one run, or two for convert-then-remove
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReport {
    pub operation: Operation,
    pub runs: Vec<RunReport>,
    pub objects_created: usize,
}

impl OperationReport {
    /// Combined outcome across all runs
    pub fn outcome(&self) -> RunOutcome {
        if self.runs.iter().any(|r| r.cancelled) {
            let processed = self.runs.iter().map(|r| r.attempted()).sum();
            return RunOutcome::Cancelled { processed };
        }
        let mut failed = Vec::new();
        let mut skipped = 0;
        for run in &self.runs {
            failed.extend(run.failures().map(|f| f.unit));
            skipped += run.skipped();
        }
        if failed.is_empty() && skipped == 0 {
            RunOutcome::Success
        } else {
            RunOutcome::PartialFailure { failed, skipped }
        }
    }

    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.runs.iter().map(|r| r.summary()).collect();
        if self.objects_created > 0 {
            lines.push(format!("{} scene objects created", self.objects_created));
        }
        lines.join("\n")
    }
}

/// Run `op` over `target`.
///
/// `confirmed` is the user's answer to [`Operation::confirmation_message`];
/// nothing is loaded or changed without it.
pub fn execute(
    op: &Operation,
    target: &OperationTarget,
    confirmed: bool,
    ctx: &mut OperationContext<'_>,
) -> Result<OperationReport> {
    if !confirmed {
        return Err(Error::precondition(format!("'{}' was not confirmed", op.name())));
    }
    op.validate()?;

    let options = RunOptions::new(op.name()).confirmation(confirmed);
    let objects_before = ctx.scene.len();

    let runs = match *op {
        Operation::SetHeight { height } => {
            let mut buffer = HeightBuffer::new();
            let report = ctx.executor.run(ctx.provider, target, &options, ctx.reporter, |u| {
                buffer.apply(u, height)
            })?;
            log::debug!("Height buffer rebuilt {} times, refilled {}", buffer.rebuilds(), buffer.refills());
            vec![report]
        }
        Operation::ApplySettingsFromPrototype { prototype, copy_heightmap_resolution } => {
            let template = PrototypeTemplate::capture_from(ctx.provider, prototype)?;
            let report = ctx.executor.run(ctx.provider, target, &options, ctx.reporter, |u| {
                template.apply_to(u, copy_heightmap_resolution)
            });
            drop(template);
            vec![report?]
        }
        Operation::CopyResources { source, kinds } => {
            let snapshot = ResourceSnapshot::capture_from(ctx.provider, source)?;
            let report = ctx.executor.run(ctx.provider, target, &options, ctx.reporter, |u| {
                copy_resources(&snapshot, u, kinds)
            })?;
            vec![report]
        }
        Operation::RemoveResources { kinds } => {
            let report = ctx.executor.run(ctx.provider, target, &options, ctx.reporter, |u| {
                remove_resources(u, kinds)
            })?;
            vec![report]
        }
        Operation::ConvertTreesToGameObjects { remove_after } => convert_trees(
            ctx.executor,
            ctx.provider,
            ctx.reporter,
            ctx.scene,
            target,
            &options,
            remove_after,
        )?,
    };

    Ok(OperationReport {
        operation: op.clone(),
        runs,
        objects_created: ctx.scene.len() - objects_before,
    })
}
