//! Mass edit binary: runs one batch operation over a world directory.
//!
//! Usage: cargo run --release --bin mass_edit -- --world <DIR> [OPTIONS]
//!
//! Options:
//!   --list                   Print the world's units and exit
//!   --op <NAME>              set-height | apply-settings | copy-resources |
//!                            remove-resources | convert-trees
//!   --job <FILE>             JSON job: {"operation": {...}, "target": ...}
//!   --target <SEL>           all | active | comma-separated ids, empty
//!                            entries allowed (default: all)
//!   --height <H>             Target height for set-height
//!   --prototype <ID>         Prototype unit for apply-settings
//!   --copy-heightmap-res     apply-settings also copies heightmap resolution
//!   --source <ID>            Source unit for copy-resources
//!   --kinds <LIST>           layers,trees,details (default: all three)
//!   --remove-after           convert-trees removes the original trees
//!   --config <FILE>          Batch config JSON
//!   --yes                    Confirm without prompting

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::Deserialize;

use terra_batch::batch::{BatchExecutor, MassEditSession, RunOutcome};
use terra_batch::core::error::Error;
use terra_batch::core::{logging, BatchConfig, Result};
use terra_batch::ops::{Operation, OperationContext, ResourceKinds, SceneObjects};
use terra_batch::progress::LogProgress;
use terra_batch::provider::{OperationTarget, StreamingWorld};
use terra_batch::terrain::UnitId;

#[derive(Deserialize)]
struct Job {
    operation: Operation,
    #[serde(default = "all_units")]
    target: OperationTarget,
}

fn all_units() -> OperationTarget {
    OperationTarget::AllUnits
}

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether every unit succeeded
fn run(args: &[String]) -> Result<bool> {
    let world_dir = parse_str_arg(args, "--world")
        .map(PathBuf::from)
        .ok_or_else(|| Error::Config("--world <DIR> is required".into()))?;

    let config = match parse_str_arg(args, "--config") {
        Some(path) => BatchConfig::load(path)?,
        None => BatchConfig::default(),
    };

    let mut world = StreamingWorld::open(&world_dir, &config)?;

    if has_flag(args, "--list") {
        println!("World '{}' ({} units)", world.manifest().name, world.manifest().units.len());
        for entry in &world.manifest().units {
            println!(
                "  {:>5}  {:<24} {:<8} {} trees",
                entry.id.to_string(),
                entry.name,
                if entry.active { "active" } else { "inactive" },
                entry.tree_count
            );
        }
        return Ok(true);
    }

    let (op, target) = match parse_str_arg(args, "--job") {
        Some(path) => {
            let job: Job = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            (job.operation, job.target)
        }
        None => (parse_operation(args)?, parse_target(args)?),
    };

    let mut session = MassEditSession::new();
    let prompt = session.propose(op, target)?;

    if !has_flag(args, "--yes") && !ask(&prompt)? {
        session.decline()?;
        println!("Cancelled; nothing changed.");
        return Ok(true);
    }

    let executor = BatchExecutor::new(config);
    let mut reporter = LogProgress::new(10);
    let mut scene = SceneObjects::new();
    let mut ctx = OperationContext {
        executor: &executor,
        provider: &mut world,
        reporter: &mut reporter,
        scene: &mut scene,
    };

    let report = session.confirm(&mut ctx)?;
    println!("{}", report.summary());
    for failure in report.runs.iter().flat_map(|r| r.failures()) {
        println!("  failed {}", failure);
    }
    let ok = matches!(report.outcome(), RunOutcome::Success);

    world.flush()?;
    Ok(ok)
}

fn parse_operation(args: &[String]) -> Result<Operation> {
    let name = parse_str_arg(args, "--op")
        .ok_or_else(|| Error::Config("one of --op or --job is required".into()))?;

    let op = match name.as_str() {
        "set-height" => Operation::SetHeight {
            height: parse_arg(args, "--height")
                .ok_or_else(|| Error::Config("set-height needs --height <H>".into()))?,
        },
        "apply-settings" => Operation::ApplySettingsFromPrototype {
            prototype: parse_arg(args, "--prototype")
                .map(UnitId)
                .ok_or_else(|| Error::Config("apply-settings needs --prototype <ID>".into()))?,
            copy_heightmap_resolution: has_flag(args, "--copy-heightmap-res"),
        },
        "copy-resources" => Operation::CopyResources {
            source: parse_arg(args, "--source")
                .map(UnitId)
                .ok_or_else(|| Error::Config("copy-resources needs --source <ID>".into()))?,
            kinds: parse_kinds(args)?,
        },
        "remove-resources" => Operation::RemoveResources { kinds: parse_kinds(args)? },
        "convert-trees" => Operation::ConvertTreesToGameObjects {
            remove_after: has_flag(args, "--remove-after"),
        },
        other => return Err(Error::Config(format!("unknown operation '{}'", other))),
    };
    Ok(op)
}

fn parse_kinds(args: &[String]) -> Result<ResourceKinds> {
    let Some(list) = parse_str_arg(args, "--kinds") else {
        return Ok(ResourceKinds::all());
    };
    let mut kinds = ResourceKinds::none();
    for kind in list.split(',').map(str::trim) {
        match kind {
            "layers" => kinds.layers = true,
            "trees" => kinds.trees = true,
            "details" => kinds.details = true,
            other => return Err(Error::Config(format!("unknown resource kind '{}'", other))),
        }
    }
    Ok(kinds)
}

fn parse_target(args: &[String]) -> Result<OperationTarget> {
    let target = match parse_str_arg(args, "--target").as_deref() {
        None | Some("all") => OperationTarget::AllUnits,
        Some("active") => OperationTarget::ActiveUnitsOnly,
        Some(list) => {
            let mut ids = Vec::new();
            for entry in list.split(',').map(str::trim) {
                if entry.is_empty() {
                    ids.push(None);
                    continue;
                }
                let id = entry
                    .trim_start_matches('#')
                    .parse()
                    .map_err(|_| Error::Config(format!("bad unit id '{}'", entry)))?;
                ids.push(Some(UnitId(id)));
            }
            OperationTarget::ExplicitList(ids)
        }
    };
    Ok(target)
}

fn ask(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
